fn main() -> eframe::Result<()> {
    tutor::native::run()
}
