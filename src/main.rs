//! Galaxy initial conditions generator




// ============================================================================
use std::io::stdin;
use clap::Parser;
use galaxy_ics::app::{self, App, Configuration};
use galaxy_ics::galaxy::{self, Galaxy};
use galaxy_ics::io;
use galaxy_ics::potential;




// ============================================================================
#[derive(Parser, Debug)]
#[command(about = app::DESCRIPTION)]
struct Args {
    /// Configuration file (.yaml) or the name of a preset
    input: String,

    /// Configuration overrides of the form key.path=value
    overrides: Vec<String>,

    /// Generate a galaxy without gas
    #[arg(long)]
    nogas: bool,

    /// Reuse an existing potential grid file without asking
    #[arg(long = "force-yes")]
    force_yes: bool,

    /// Name of the output file
    #[arg(short = 'o')]
    output: Option<String>,

    /// Number of workers filling the potential grid; must be a factor of
    /// the number of grid cells
    #[arg(long)]
    cores: Option<usize>,
}




// ============================================================================
impl Args {

    /**
     * The key=value overrides, followed by those implied by the flags.
     */
    fn all_overrides(&self) -> Vec<String> {
        let mut overrides = self.overrides.clone();

        if self.nogas {
            overrides.push("gas.enabled=false".into());
        }
        if self.force_yes {
            overrides.push("control.force_yes=true".into());
        }
        if let Some(output) = &self.output {
            overrides.push(format!("control.output={}", output));
        }
        if let Some(cores) = self.cores {
            overrides.push(format!("control.num_threads={}", cores));
        }
        overrides
    }
}

/**
 * Resolves on ctrl-c; never resolves if the signal handler cannot be
 * installed.
 */
async fn interrupt() {
    if tokio::signal::ctrl_c().await.is_err() {
        log::warn!("could not listen for ctrl-c");
        futures::future::pending::<()>().await
    }
}




// ============================================================================
fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let App { config, version } = App::from_preset_or_file(&args.input, &args.all_overrides())?.validate()?;
    let Configuration { control, .. } = &config;
    let num_workers = config.num_workers();

    println!();
    println!("\t{}", app::DESCRIPTION);
    println!("\t{}", version);
    println!();
    println!("\tinput file ........ {}", args.input);
    println!("\tpotential file .... {}", control.potential_file);
    println!("\toutput file ....... {}", control.output);
    println!("\tgrid workers ...... {}", num_workers);
    println!();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .max_blocking_threads(num_workers)
        .enable_all()
        .build()?;

    match galaxy::generate(&config, &runtime, stdin().lock(), interrupt()) {
        Ok(Galaxy { particles, .. }) => {
            io::write_cbor(&particles, &control.output)?;
            Ok(())
        }
        Err(galaxy::Error::Potential(potential::Error::Cancelled)) => {
            println!("process cancelled");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
