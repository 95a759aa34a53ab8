//! Prints the Argon2 PHC hash of a password for `user.accounts[].password_hash`.
//!
//! $ cargo run --bin hash_password -- 'correct horse battery staple'

use clap::Parser;
use sessiongate::application_impl::Argon2PasswordHasher;
use sessiongate::application_port::CredentialHasher;

#[derive(Parser, Debug)]
struct Args {
    password: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let hash = Argon2PasswordHasher.hash_password(&args.password).await?;
    println!("{hash}");
    Ok(())
}
