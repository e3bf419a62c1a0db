// mipsasm - two-pass assembler for a MIPS subset
// Assembles a source file to a flat binary, resolving labels in a single patch pass

use std::env;
use std::fs;
use std::path::Path;
use std::process;

use mipspatch::{assemble_source, AssemblerConfig};

fn main() {
    // Initialize logging
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        process::exit(1);
    }

    let mut input_file = "";
    let mut output_file = String::new();
    let mut config_file = String::new();
    let mut listing = false;
    let mut verbose = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-o" | "--output" => {
                if i + 1 >= args.len() {
                    eprintln!("Error: -o requires a filename");
                    process::exit(1);
                }
                output_file = args[i + 1].clone();
                i += 2;
            }
            "-c" | "--config" => {
                if i + 1 >= args.len() {
                    eprintln!("Error: -c requires a filename");
                    process::exit(1);
                }
                config_file = args[i + 1].clone();
                i += 2;
            }
            "-l" | "--listing" => {
                listing = true;
                i += 1;
            }
            "-v" | "--verbose" => {
                verbose = true;
                i += 1;
            }
            "-h" | "--help" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            arg if arg.starts_with('-') => {
                eprintln!("Error: Unknown option '{}'", arg);
                print_usage(&args[0]);
                process::exit(1);
            }
            _ => {
                if input_file.is_empty() {
                    input_file = &args[i];
                } else {
                    eprintln!("Error: Multiple input files specified");
                    process::exit(1);
                }
                i += 1;
            }
        }
    }

    if input_file.is_empty() {
        eprintln!("Error: No input file specified");
        print_usage(&args[0]);
        process::exit(1);
    }

    if output_file.is_empty() {
        let input_path = Path::new(input_file);
        let base_name = input_path.file_stem().unwrap_or_else(|| {
            eprintln!("Error: Invalid input filename");
            process::exit(1);
        });
        output_file = format!("{}.bin", base_name.to_string_lossy());
    }

    let config = if config_file.is_empty() {
        AssemblerConfig::default()
    } else {
        match AssemblerConfig::load(&config_file) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("{}", err);
                process::exit(1);
            }
        }
    };
    let listing = listing || config.listing;

    if verbose {
        println!(
            "Assembling {} -> {} (base 0x{:08x}, {:?} endian)",
            input_file, output_file, config.base_address, config.endian
        );
    }

    let source = match fs::read_to_string(input_file) {
        Ok(content) => content,
        Err(err) => {
            eprintln!("Error reading '{}': {}", input_file, err);
            process::exit(1);
        }
    };

    let assembler = match assemble_source(&source, config) {
        Ok(assembler) => assembler,
        Err(err) => {
            eprintln!("{}", err);
            process::exit(1);
        }
    };

    if listing {
        for line in assembler.listing() {
            println!("{}", line);
        }
    }

    let bytes = match assembler.final_bytes() {
        Ok(bytes) => bytes,
        Err(err) => {
            eprintln!("error: {}", err);
            process::exit(1);
        }
    };

    if let Err(err) = fs::write(&output_file, &bytes) {
        eprintln!("Error writing '{}': {}", output_file, err);
        process::exit(1);
    }

    if verbose {
        println!(
            "Wrote {} instructions ({} bytes) to {}",
            assembler.stream().len(),
            bytes.len(),
            output_file
        );
    }
}

fn print_usage(program_name: &str) {
    println!("Usage: {} [options] <input.s>", program_name);
    println!();
    println!("Options:");
    println!("  -o, --output <file>    Output filename (default: input.bin)");
    println!("  -c, --config <file>    TOML configuration file");
    println!("  -l, --listing          Print a disassembly listing");
    println!("  -v, --verbose          Verbose output");
    println!("  -h, --help             Show this help message");
    println!();
    println!("Configuration keys:");
    println!("  base_address                 Address of the first instruction (default 0)");
    println!("  check_displacement_overflow  Reject out-of-range branches (default true)");
    println!("  endian                       \"little\" or \"big\" (default little)");
    println!("  listing                      Same as -l");
    println!();
    println!("Set RUST_LOG=debug to trace label definitions and patches.");
}
