fn main() {
    println!("cargo:rerun-if-env-changed=HOMEGUARD_DEVICE");
    println!("cargo:rerun-if-env-changed=HOMEGUARD_WIFI_SSID");
    println!("cargo:rerun-if-env-changed=HOMEGUARD_WIFI_PASS");
    println!("cargo:rerun-if-env-changed=HOMEGUARD_MQTT_HOST");
    println!("cargo:rerun-if-env-changed=HOMEGUARD_MQTT_PASS");

    // ESP-IDF link arguments are only needed for the on-device build.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
