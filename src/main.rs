use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};
use hitsieve::{
    analyse_hits_batch,
    constants::{
        DEFAULT_BRIGHT_AREA_CUTOFF, DEFAULT_BRIGHT_THRESHOLD, DEFAULT_HOT_PIXEL_OFTEN,
        DEFAULT_LOG_EVERY, DEFAULT_NEAR_HOT_PIXEL_DISTANCE, DEFAULT_NEAR_HOT_PIXEL_OFTEN,
        DEFAULT_TIME_DIVISION, DEFAULT_TOO_OFTEN, FRAME_CONTENT, FRAME_DECODED,
        FRAME_DECODED_ORIG,
    },
    imaging::frame_decoder::hit_load_parser,
    io::{
        csv_writer::{gen_csv_header, write_to_csv, ColumnFilter},
        stream_extractor::{accept_all, load_objects_from_stream},
    },
    Config, Hit,
};
use log::{info, warn};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Datatype {
    Users,
    Devices,
    Teams,
    Hits,
    Pings,
}

#[derive(Parser, Debug)]
#[command(
    name = "hitsieve",
    about = "Classify cosmic-ray hits from a JSON array without a database (PNG and CSV output only)"
)]
struct Cli {
    /// Kind of objects held by the input array; only hits are analysed
    #[arg(short, long, value_enum, default_value = "hits")]
    datatype: Datatype,

    /// Input JSON file, `-` for stdin
    #[arg(short, long, default_value = "-")]
    input_file: String,

    /// Directory for debug PNGs and output.csv; the CSV goes to stdout when absent
    #[arg(short, long, env = "HITSIEVE_OUT_DIR")]
    out_dir: Option<Utf8PathBuf>,

    /// Time window (ms) of the too-often pass and of the reconstruction partition
    #[arg(long, default_value_t = DEFAULT_TIME_DIVISION)]
    time_division: i64,

    #[arg(long, default_value_t = DEFAULT_HOT_PIXEL_OFTEN)]
    hot_pixel_often: usize,

    #[arg(long, default_value_t = DEFAULT_NEAR_HOT_PIXEL_OFTEN)]
    near_hot_pixel_often: usize,

    /// Radius (px) of the clustered near-hot-pixel pass
    #[arg(long, default_value_t = DEFAULT_NEAR_HOT_PIXEL_DISTANCE)]
    near_hot_pixel_distance: f64,

    #[arg(long, default_value_t = DEFAULT_NEAR_HOT_PIXEL_OFTEN)]
    near_hot_pixel2_often: usize,

    /// Radius (px) of the exhaustive near-hot-pixel pass
    #[arg(long, default_value_t = DEFAULT_NEAR_HOT_PIXEL_DISTANCE)]
    near_hot_pixel2_distance: f64,

    #[arg(long, default_value_t = DEFAULT_TOO_OFTEN)]
    too_often: usize,

    /// Pixel value from which a pixel counts toward the bright area
    #[arg(long, default_value_t = DEFAULT_BRIGHT_THRESHOLD)]
    bright_threshold: u8,

    /// Bright area cutoff, per-mille of the crop
    #[arg(long, default_value_t = DEFAULT_BRIGHT_AREA_CUTOFF)]
    bright_area_cutoff: f64,

    /// Keep the crops as sent by the devices
    #[arg(long)]
    no_reconstruct: bool,

    /// Objects parsed between two progress lines
    #[arg(long, default_value_t = DEFAULT_LOG_EVERY)]
    log_every: usize,

    /// Disable progress logging
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn config(&self) -> Result<Config> {
        let config = Config::builder()
            .maybe_out_dir(self.out_dir.clone())
            .log(!self.quiet)
            .log_every(self.log_every)
            .time_division(self.time_division)
            .hot_pixel_often(self.hot_pixel_often)
            .near_hot_pixel_often(self.near_hot_pixel_often)
            .near_hot_pixel_distance(self.near_hot_pixel_distance)
            .near_hot_pixel2_often(self.near_hot_pixel2_often)
            .near_hot_pixel2_distance(self.near_hot_pixel2_distance)
            .too_often(self.too_often)
            .bright_threshold(self.bright_threshold)
            .bright_area_cutoff(self.bright_area_cutoff)
            .reconstruct(!self.no_reconstruct)
            .build()?;
        Ok(config)
    }

    fn input(&self) -> Result<Box<dyn BufRead>> {
        if self.input_file == "-" {
            return Ok(Box::new(io::stdin().lock()));
        }
        let file = File::open(&self.input_file)
            .with_context(|| format!("failed to open input file {}", self.input_file))?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn output(&self) -> Result<Box<dyn Write>> {
        match &self.out_dir {
            Some(dir) => {
                fs::create_dir_all(dir)
                    .with_context(|| format!("failed to create output directory {dir}"))?;
                let path = dir.join("output.csv");
                let file =
                    File::create(&path).with_context(|| format!("failed to create {path}"))?;
                Ok(Box::new(BufWriter::new(file)))
            }
            None => Ok(Box::new(io::stdout().lock())),
        }
    }
}

fn write_hits(cli: &Cli, hits: &[Hit]) -> Result<()> {
    let filter = ColumnFilter::new()
        .exclude(FRAME_CONTENT)
        .exclude(FRAME_DECODED)
        .exclude(FRAME_DECODED_ORIG)
        .exclude_regex(r"image_brighter_count_\d\d\d")?;
    let header = gen_csv_header(hits);
    let columns = write_to_csv(cli.output()?, hits, &header, &filter)?;
    info!("wrote {} rows of {} columns", hits.len(), columns.len());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = cli.config()?;
    let input = cli.input()?;

    if cli.datatype != Datatype::Hits {
        let (objects, _) = load_objects_from_stream::<Value, _, _>(input, &config, accept_all)?;
        warn!(
            "{} {:?} objects loaded; only hits are analysed",
            objects.len(),
            cli.datatype
        );
        return Ok(());
    }

    let (mut hits, stats) = load_objects_from_stream(input, &config, hit_load_parser)?;
    info!(
        "{} hits accepted, {} rejected without image payload",
        stats.accepted, stats.rejected
    );
    analyse_hits_batch(&mut hits, &config)?;
    write_hits(&cli, &hits)
}
