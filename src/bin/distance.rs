use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;

use wordvec::{real, VectorFormat, Vectors};

/// number of closest words that will be shown
const N: usize = 40;

#[derive(Parser)]
#[command(about = "Show the words closest to a word or sentence", long_about = None)]
struct Options {
    /// Contains word projections, as written by `wordvec --output`
    #[arg(value_name = "FILE")]
    file_name: PathBuf,

    /// FILE is in binary format
    #[arg(long)]
    binary: bool,
}

fn run(options: &Options) -> Result<()> {
    let format = if options.binary {
        VectorFormat::Binary
    } else {
        VectorFormat::Text
    };
    let vectors = Vectors::load(&options.file_name, format)
        .with_context(|| format!("error reading {}", options.file_name.display()))?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    'outer: loop {
        print!("Enter word or sentence (EXIT to break): ");
        io::stdout().flush()?;

        let mut st1 = String::new();
        if input.read_line(&mut st1).context("error reading stdin")? == 0 {
            break;
        }
        let st1 = st1.trim();
        if st1 == "EXIT" {
            break;
        }

        let mut bi: Vec<usize> = vec![];
        for sta in st1.split_whitespace() {
            println!();
            println!("Word: {sta}  Position in vocabulary: ");
            match vectors.lookup_word(sta) {
                None => {
                    println!("None");
                    println!("Out of dictionary word!");
                    continue 'outer;
                }
                Some(i) => {
                    println!("{i}");
                    bi.push(i);
                }
            }
        }
        if bi.is_empty() {
            continue;
        }

        println!();
        println!("                                              Word       Cosine distance");
        println!("------------------------------------------------------------------------");

        let mut vec: Vec<real> = vec![0.0; vectors.size()];
        for &i in &bi {
            for (v, r) in vec.iter_mut().zip(vectors[i].iter().copied()) {
                *v += r;
            }
        }
        for (word, dist) in vectors.nearest(&vec, N, &bi) {
            println!("{:50}\t\t{}", word, dist);
        }
    }
    Ok(())
}

fn main() {
    let options = Options::parse();
    if let Err(err) = run(&options) {
        eprintln!("{err:#}");
        process::exit(1);
    }
}
