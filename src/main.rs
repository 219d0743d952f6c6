#![recursion_limit = "131"]

use std::path::PathBuf;

use burn::backend::Wgpu;
use burn::tensor::backend::Backend;
use clap::{Parser, Subcommand, ValueEnum};

use pointfold::data::load_point_cloud;
use pointfold::inference::{reconstruct, tensor_to_points, write_vtk_legacy};
use pointfold::model::ArchitectureSummary;
use pointfold::{
    ArchitectureSearch, DiscriminatorConfig, FoldingNetConfig, MlpNetConfig, Passthrough,
    PointCloudAutoencoder, Result, TrsNetConfig,
};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Architecture {
    /// Graph-convolution encoder.
    Folding,
    /// Transformer encoder.
    Trs,
    /// Plain MLP encoder.
    Mlp,
    /// Identity network.
    Passthrough,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconstruct a point cloud sampled from an STL mesh.
    Reconstruct {
        /// STL mesh to sample.
        #[arg(short, long)]
        mesh: PathBuf,
        #[arg(short, long, value_enum, default_value_t = Architecture::Mlp)]
        arch: Architecture,
        /// Points sampled from the mesh.
        #[arg(long, default_value_t = 1024)]
        num_points: usize,
        /// Points in the reconstruction (defaults to `num_points`).
        #[arg(long)]
        num_nodes: Option<usize>,
        /// Neighbours per point in the graph of the folding network.
        #[arg(short, long, default_value_t = 16)]
        neighbors: usize,
        #[arg(long, default_value_t = 64)]
        h1: usize,
        #[arg(long, default_value_t = 32)]
        h3: usize,
        /// Output VTK file.
        #[arg(short, long, default_value = "artifacts/out.vtk")]
        output: PathBuf,
    },
    /// Score a point cloud sampled from an STL mesh with the discriminator.
    Score {
        #[arg(short, long)]
        mesh: PathBuf,
        #[arg(long, default_value_t = 1024)]
        num_points: usize,
    },
    /// Print the layer widths of an autoencoder as JSON.
    Describe {
        #[arg(short, long, value_enum, default_value_t = Architecture::Mlp)]
        arch: Architecture,
        #[arg(long, default_value_t = 64)]
        h1: usize,
        #[arg(long, default_value_t = 32)]
        h3: usize,
    },
}

fn build<B: Backend>(
    arch: Architecture,
    h1: usize,
    h3: usize,
    device: &B::Device,
) -> Result<Box<dyn PointCloudAutoencoder<B>>> {
    let model: Box<dyn PointCloudAutoencoder<B>> = match arch {
        Architecture::Folding => Box::new(FoldingNetConfig::new(h1, h3).init::<B>(device)?),
        Architecture::Trs => Box::new(TrsNetConfig::new(h1).init::<B>(device)?),
        Architecture::Mlp => Box::new(MlpNetConfig::new(h1, h3).init::<B>(device)?),
        Architecture::Passthrough => Box::new(Passthrough::new()),
    };
    Ok(model)
}

fn summary<B: Backend>(
    arch: Architecture,
    h1: usize,
    h3: usize,
    device: &B::Device,
) -> Result<Option<ArchitectureSummary>> {
    let summary = match arch {
        Architecture::Folding => FoldingNetConfig::new(h1, h3)
            .init::<B>(device)?
            .registry()
            .summary(),
        Architecture::Trs => TrsNetConfig::new(h1).init::<B>(device)?.registry().summary(),
        Architecture::Mlp => MlpNetConfig::new(h1, h3)
            .init::<B>(device)?
            .registry()
            .summary(),
        Architecture::Passthrough => return Ok(None),
    };
    Ok(Some(summary))
}

fn run(cli: Cli) -> Result<()> {
    type MyBackend = Wgpu<f32, i32>;
    let device = burn::backend::wgpu::WgpuDevice::default();

    match cli.command {
        Commands::Reconstruct {
            mesh,
            arch,
            num_points,
            num_nodes,
            neighbors,
            h1,
            h3,
            output,
        } => {
            let start = std::time::Instant::now();
            let points = load_point_cloud::<MyBackend, _>(&mesh, num_points, &device)?;
            let model = build::<MyBackend>(arch, h1, h3, &device)?;
            let reconstructed = reconstruct(
                model.as_ref(),
                points,
                neighbors,
                num_nodes.unwrap_or(num_points),
            )?;

            if let Some(dir) = output.parent() {
                std::fs::create_dir_all(dir)?;
            }
            write_vtk_legacy(&tensor_to_points(reconstructed)?, &output)?;
            log::info!(
                "wrote {} in {:?}",
                output.display(),
                start.elapsed()
            );
        }
        Commands::Score { mesh, num_points } => {
            let points = load_point_cloud::<MyBackend, _>(&mesh, num_points, &device)?;
            let discriminator = DiscriminatorConfig::new().init::<MyBackend>(&device);
            let score = discriminator.forward(points).into_scalar();
            println!("{score}");
        }
        Commands::Describe { arch, h1, h3 } => match summary::<MyBackend>(arch, h1, h3, &device)? {
            Some(summary) => println!(
                "{}",
                serde_json::to_string_pretty(&summary).map_err(std::io::Error::other)?
            ),
            None => println!("{{}}"),
        },
    }

    Ok(())
}

fn main() {
    env_logger::init();

    if let Err(err) = run(Cli::parse()) {
        log::error!("{err}");
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
