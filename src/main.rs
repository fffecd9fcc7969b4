fn main() {
    moods_lib::run()
}
