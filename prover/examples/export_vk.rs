use prover::proof_generator::{CircuitShape, Groth16Oracle};
use std::fs;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut oracle = Groth16Oracle::new();

    // Setup to generate one verifying key per circuit shape
    oracle.setup()?;

    for shape in CircuitShape::ALL {
        let vk_bytes = oracle.serialize_verifying_key(shape)?;
        let name = shape.name();

        // Write as hex bytes for embedding in Rust code
        println!("// {} verifying key bytes (length: {})", name, vk_bytes.len());
        print!("const {}_VK_BYTES: &[u8] = &[", name.to_uppercase());

        for (i, byte) in vk_bytes.iter().enumerate() {
            if i % 16 == 0 {
                print!("\n    ");
            }
            print!("0x{:02x}, ", byte);
        }

        println!("\n];\n");

        let path = format!("{}_vk.bin", name);
        fs::write(&path, &vk_bytes)?;
        println!("// Written to {} ({} bytes)\n", path, vk_bytes.len());
    }

    Ok(())
}
