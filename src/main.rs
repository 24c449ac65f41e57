use std::{env, io, process};

use loxide::Loxide;

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut stdout = io::stdout();
    let mut loxide = Loxide::new(&mut stdout);

    match args.len() {
        n if n > 2 => {
            println!("Usage: loxide [script]");
            process::exit(64);
        },
        2 => loxide.run_file(&args[1]),
        _ => loxide.run_prompt(),
    };
}
