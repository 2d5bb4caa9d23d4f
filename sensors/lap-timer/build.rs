fn main() {
    // Provide app_main stub for ESP-IDF
    embuild::espidf::sysenv::output();
}
