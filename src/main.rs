fn main() -> anyhow::Result<()> {
    red_hot_floppy::run()
}
