//! Relayer-side tooling for the quorum bridge.

mod cli;
mod simulate;

fn main() -> eyre::Result<()> {
    cli::run()
}
