use std::io::ErrorKind;
use std::path::Path;
use std::{fs, io};

fn main() -> io::Result<()> {
    use_vendored_protoc()?;
    build_proto()?;
    Ok(())
}

fn use_vendored_protoc() -> io::Result<()> {
    if std::env::var_os("PROTOC").is_some() {
        return Ok(());
    }
    let protoc = protoc_bin_vendored::protoc_bin_path().map_err(|e| io::Error::new(ErrorKind::NotFound, e))?;
    std::env::set_var("PROTOC", protoc);
    Ok(())
}

fn build_proto() -> io::Result<()> {
    idempotent_create_dir("./generated/")?;
    println!("cargo:rerun-if-changed=protos/");
    tonic_build::configure()
        .out_dir("./generated/")
        .compile_protos(&["./protos/log.proto", "./protos/raft.proto"], &["./protos/"])
}

fn idempotent_create_dir<P: AsRef<Path>>(path: P) -> io::Result<()> {
    match fs::create_dir(path) {
        Ok(_) => Ok(()),
        Err(e) => match e.kind() {
            ErrorKind::AlreadyExists => Ok(()),
            _ => Err(e),
        },
    }
}
