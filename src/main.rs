fn main() -> anyhow::Result<()> {
    cutmark_lib::run()
}
