fn main() {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap();
    let def_file = format!("{manifest_dir}/exports/wincrt.def");
    let target_env = std::env::var("CARGO_CFG_TARGET_ENV").unwrap_or_default();
    let exporting = std::env::var_os("CARGO_FEATURE_EXPORT_SYMBOLS").is_some();
    if exporting && target_env == "msvc" && std::path::Path::new(&def_file).exists() {
        println!("cargo:rustc-cdylib-link-arg=/DEF:{def_file}");
    }
    println!("cargo:rerun-if-changed=exports/wincrt.def");
}
