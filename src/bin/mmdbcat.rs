//! `mmdbcat`: a thin CLI driver over the `mmdb` library — parse arguments,
//! open the database, print a result, set the process exit code.

use clap::Parser;
use mmdb::Database;

/// Look up an address in a MaxMind DB file and print the matching record
/// as JSON.
#[derive(Parser, Debug)]
#[command(name = "mmdbcat", version)]
struct Args {
    /// Path to the .mmdb file.
    database: String,

    /// Address to look up (IPv4 dotted-quad or IPv6 colon-hex).
    address: String,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let database = match Database::open(&args.database) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    match database.lookup(&args.address) {
        Ok(Some(value)) => {
            let json = if args.pretty {
                serde_json::to_string_pretty(&value)
            } else {
                serde_json::to_string(&value)
            };
            println!("{}", json.expect("Value serialization is infallible"));
        }
        Ok(None) => {
            eprintln!("No record found for {}", args.address);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    }
}
