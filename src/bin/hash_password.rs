use second_hunt::admin::hash_password;
use std::{env, process::ExitCode};

fn main() -> ExitCode {
    let Some(password) = env::args().nth(1) else {
        eprintln!("usage: hash_password <password>");
        return ExitCode::FAILURE;
    };

    let hash = hash_password(&password);
    println!("{hash}");
    println!();
    println!("Add to the server environment:");
    println!("ADMIN_PASSWORD_HASH={hash}");
    ExitCode::SUCCESS
}
