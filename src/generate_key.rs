// generate_key.rs
// Utility to generate a token signing secret for the catalog server

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;

fn main() {
    println!("Generating new token signing secret...\n");

    let mut secret = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut secret);
    let encoded = URL_SAFE_NO_PAD.encode(secret);

    println!("✅ Secret generated successfully!\n");
    println!("Add this to your .env file:");
    println!("─────────────────────────────────────────────────");
    println!("TOKEN_SECRET={}", encoded);
    println!("─────────────────────────────────────────────────");
    println!("\n⚠️  IMPORTANT:");
    println!("  • Keep this secret out of version control");
    println!("  • Changing it invalidates every token already issued");
    println!("  • Without it the server generates a new secret on each start");
}
