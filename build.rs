use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto/dashwatch.proto");

    // Prefer a system protoc when one is configured; fall back to the vendored binary.
    if std::env::var_os("PROTOC").is_none() {
        if let Ok(protoc) = protoc_bin_vendored::protoc_bin_path() {
            std::env::set_var("PROTOC", protoc);
        }
    }

    let protos = [PathBuf::from("proto/dashwatch.proto")];
    let mut includes = vec![PathBuf::from("proto")];
    if let Ok(well_known) = protoc_bin_vendored::include_path() {
        includes.push(well_known);
    }

    tonic_prost_build::configure().compile_protos(&protos, &includes)?;
    Ok(())
}
