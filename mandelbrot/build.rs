use std::error::Error;

#[cfg(feature = "spirv")]
use spirv_builder::{MetadataPrintout, SpirvBuilder};

fn main() -> Result<(), Box<dyn Error>> {
    println!("cargo:rerun-if-changed=../shader/src");
    println!("cargo:rerun-if-changed=../shared/src");

    #[cfg(feature = "spirv")]
    SpirvBuilder::new("../shader", "spirv-unknown-spv1.5")
        .print_metadata(MetadataPrintout::Full)
        .build()?;

    Ok(())
}
