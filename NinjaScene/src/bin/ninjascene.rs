fn main() -> anyhow::Result<()> {
    ninjascene::cli::run_cli()
}
