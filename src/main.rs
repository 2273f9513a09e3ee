mod pretty;
mod run;
mod sim;
mod study;
mod variates;

use bpaf::Bpaf;

/// Batch-means simulation study of a single-server queue
#[derive(Bpaf, Clone, Debug)]
#[bpaf(options)]
enum Subcommand {
    #[bpaf(command)]
    Run(#[bpaf(external(run::options))] run::Options),
    /// Print the default study parameters as JSON
    #[bpaf(command("default-config"))]
    DefaultConfig,
}

fn main() {
    env_logger::init();
    let result = match subcommand().run() {
        Subcommand::Run(opts) => run::run(opts),
        Subcommand::DefaultConfig => run::default_config(),
    };
    match result {
        Ok(()) => (),
        Err(e) => {
            // Ignore EPIPE
            if let Some(e) = e.downcast_ref::<std::io::Error>() {
                if e.kind() == std::io::ErrorKind::BrokenPipe {
                    return;
                }
            }
            eprintln!("Error: {:#}", e);
            std::process::exit(1)
        }
    }
}
