fn main() {
    daywatch_lib::run()
}
