//! Compiles the protobuf definitions into Rust code with tonic-prost-build.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    std::env::set_var(
        "PROTOC",
        protoc_bin_vendored::protoc_bin_path().expect("failed to locate vendored protoc"),
    );
    println!("cargo::rerun-if-changed=../../proto/users/v1/users.proto");

    tonic_prost_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&["../../proto/users/v1/users.proto"], &["../../proto"])?;

    Ok(())
}
