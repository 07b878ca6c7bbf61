use std::path::PathBuf;
use std::process::ExitCode;

use chanalign::{
    aligned_dims, array_from_values, channel_axis, default_fixtures, from_aligned, gather_chw,
    gather_hwc, generate_fixtures, generate_index_file, generate_tensor_file, read_indices,
    read_values, restore_file, run, to_aligned, write_values, Manifest, RealignConfig,
    RealignError, Shape, ValueDistribution, DEFAULT_ALIGN,
};
use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;

#[derive(Args, Debug)]
struct RealignArgs {
    #[arg(long, help = "YAML config file, flags below override its values")]
    config: Option<PathBuf>,
    #[arg(long, help = "Flat channel-first input, one value per line")]
    data: Option<PathBuf>,
    #[arg(long, short = 'c')]
    channels: Option<usize>,
    #[arg(long)]
    height: Option<usize>,
    #[arg(long)]
    width: Option<usize>,
    #[arg(long, short = 'o', help = "Merged channel-last output")]
    output: Option<PathBuf>,
    #[arg(long, help = "Directory for the per-group files")]
    group_dir: Option<PathBuf>,
    #[arg(long)]
    group_prefix: Option<String>,
    #[arg(long, help = "Channels per group (default 64)")]
    align: Option<usize>,
}

#[derive(Args, Debug)]
struct RestoreArgs {
    #[arg(long, short = 'i', help = "Merged channel-last file produced by realign")]
    input: PathBuf,
    #[arg(long, short = 'o')]
    output: PathBuf,
    #[arg(long, help = "manifest.json to take the shape and alignment from")]
    manifest: Option<PathBuf>,
    #[arg(long, short = 'c', conflicts_with = "manifest")]
    channels: Option<usize>,
    #[arg(long, conflicts_with = "manifest")]
    height: Option<usize>,
    #[arg(long, conflicts_with = "manifest")]
    width: Option<usize>,
    #[arg(long, conflicts_with = "manifest", default_value_t = DEFAULT_ALIGN)]
    align: usize,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    #[arg(long, short = 'i')]
    input: PathBuf,
    #[arg(long, short = 'o')]
    output: PathBuf,
    #[arg(long, value_delimiter = ',', required = true, help = "Channel-first dims: c,h,w or n,c,h,w or l,n,c,h,w")]
    dims: Vec<usize>,
    #[arg(long, default_value_t = DEFAULT_ALIGN)]
    align: usize,
    #[arg(long, help = "Read grouped channel-last data and write channel-first")]
    restore: bool,
}

#[derive(Args, Debug)]
struct GatherArgs {
    #[arg(long, short = 'i')]
    input: PathBuf,
    #[arg(long, short = 'o')]
    output: PathBuf,
    #[arg(long, value_delimiter = ',', required = true, help = "Channel-first dims of the input")]
    dims: Vec<usize>,
    #[arg(long, help = "Index file, one integer per line, negatives count from the end")]
    indices: PathBuf,
    #[arg(long, help = "Axis in channel-first numbering")]
    axis: usize,
    #[arg(long, help = "Input and output are grouped channel-last with this many channels per group")]
    align: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum GenerateCommand {
    /// The standard 3D/4D/5D tensors and index files
    Fixtures {
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        #[arg(long)]
        seed: Option<u64>,
    },
    Tensor {
        #[arg(long, short = 'o')]
        output: PathBuf,
        #[arg(long, value_delimiter = ',', required = true)]
        dims: Vec<usize>,
        #[arg(long, value_delimiter = ',', num_args = 2, help = "mean,std instead of uniform [-1, 1)")]
        normal: Option<Vec<f64>>,
        #[arg(long)]
        seed: Option<u64>,
    },
    Indices {
        #[arg(long, short = 'o')]
        output: PathBuf,
        #[arg(long)]
        count: usize,
        #[arg(long)]
        upper: usize,
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pad channels, regroup into channel-last groups and merge them
    Realign(RealignArgs),
    /// Rebuild channel-first data from a merged file
    Restore(RestoreArgs),
    /// Convert 3D/4D/5D data between channel-first and grouped channel-last
    Convert(ConvertArgs),
    /// Gather along one axis, on channel-first or grouped channel-last data
    Gather(GatherArgs),
    /// Write random test inputs
    #[command(subcommand)]
    Generate(GenerateCommand),
}

#[derive(Parser, Debug)]
#[command(name = "chanalign")]
#[command(version)]
#[command(about = "Channel-last regrouping for flat tensor files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

fn realign_config(args: RealignArgs) -> chanalign::Result<RealignConfig> {
    let mut config = match &args.config {
        Some(path) => RealignConfig::load_from_path(path)?,
        None => RealignConfig::default(),
    };

    if let Some(data) = args.data {
        config.data_path = data;
    }
    if let Some(channels) = args.channels {
        config.shape.channels = channels;
    }
    if let Some(height) = args.height {
        config.shape.height = height;
    }
    if let Some(width) = args.width {
        config.shape.width = width;
    }
    if let Some(output) = args.output {
        config.output_path = output;
    }
    if let Some(group_dir) = args.group_dir {
        config.group_dir = group_dir;
    }
    if let Some(group_prefix) = args.group_prefix {
        config.group_prefix = group_prefix;
    }
    if let Some(align) = args.align {
        config.align = align;
    }

    Ok(config)
}

fn restore_command(args: RestoreArgs) -> chanalign::Result<()> {
    let (shape, align) = match &args.manifest {
        Some(path) => {
            let manifest = Manifest::load(path)?;
            (manifest.shape, manifest.align)
        }
        None => match (args.channels, args.height, args.width) {
            (Some(c), Some(h), Some(w)) => (Shape::new(c, h, w), args.align),
            _ => {
                return Err(RealignError::InvalidShape(
                    "restore needs --manifest or all of --channels, --height and --width".to_string(),
                ))
            }
        },
    };

    restore_file(&args.input, &shape, align, &args.output)?;
    Ok(())
}

fn convert_command(args: ConvertArgs) -> chanalign::Result<()> {
    let values = read_values(&args.input)?;

    let output = if args.restore {
        let channels = args.dims[channel_axis(args.dims.len())?];
        let aligned = array_from_values(values, &aligned_dims(&args.dims, args.align)?)?;
        from_aligned(aligned.view(), channels)?
    } else {
        to_aligned(array_from_values(values, &args.dims)?.view(), args.align)?
    };

    write_values(&args.output, output.iter())?;
    tracing::info!(dims = ?args.dims, align = args.align, restore = args.restore, "converted");
    Ok(())
}

fn gather_command(args: GatherArgs) -> chanalign::Result<()> {
    let values = read_values(&args.input)?;
    let indices = read_indices(&args.indices)?;

    let output = match args.align {
        Some(align) => {
            let channels = args.dims[channel_axis(args.dims.len())?];
            let aligned = array_from_values(values, &aligned_dims(&args.dims, align)?)?;
            gather_hwc(aligned.view(), channels, &indices, args.axis)?
        }
        None => gather_chw(array_from_values(values, &args.dims)?.view(), &indices, args.axis)?,
    };

    write_values(&args.output, output.iter())?;
    tracing::info!(axis = args.axis, indices = indices.len(), shape = ?output.shape(), "gathered");
    Ok(())
}

fn rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

fn generate_command(command: GenerateCommand) -> chanalign::Result<()> {
    match command {
        GenerateCommand::Fixtures { dir, seed } => {
            generate_fixtures(&dir, &default_fixtures(), &ValueDistribution::default(), &mut rng(seed))?;
        }
        GenerateCommand::Tensor { output, dims, normal, seed } => {
            let distribution = match normal.as_deref() {
                Some([mean, std_dev]) => ValueDistribution::Normal(*mean, *std_dev),
                _ => ValueDistribution::default(),
            };
            generate_tensor_file(&output, &dims, &distribution, &mut rng(seed))?;
        }
        GenerateCommand::Indices { output, count, upper, seed } => {
            generate_index_file(&output, count, upper, &mut rng(seed))?;
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Realign(args) => realign_config(args).and_then(|config| run(&config).map(|_| ())),
        Command::Restore(args) => restore_command(args),
        Command::Convert(args) => convert_command(args),
        Command::Gather(args) => gather_command(args),
        Command::Generate(command) => generate_command(command),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "aborted");
            ExitCode::FAILURE
        }
    }
}
