//! Collection listing CLI (collwalk) - Main binary entry point

use collwalk::cli::args::{Command, ImportArgs, LsArgs, parse_args};
use collwalk::cli::output::{format_json, format_listing, format_walk, format_walk_json};
use collwalk::io::manifest::load_manifest;
use collwalk::io::{load_catalog, snapshot};
use collwalk::{CollectionHandle, CursorConfig, WalkOptions, walk_collection};
use std::process;

fn main() {
    // Initialize logger (controlled by RUST_LOG environment variable)
    // Example: RUST_LOG=debug collwalk ls grid.parquet /tempZone/home
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_help();
        return;
    }

    match args[1].as_str() {
        "--help" | "-h" => {
            print_help();
            return;
        }
        "--version" | "-v" => {
            print_version();
            return;
        }
        _ => {}
    }

    let cli_args = match parse_args(&args) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Use --help for usage information");
            process::exit(2);
        }
    };

    let exit_code = match &cli_args.command {
        Command::Ls(ls_args) => handle_ls(ls_args),
        Command::Import(import_args) => handle_import(import_args),
    };

    process::exit(exit_code);
}

fn exit_code_for(err: &collwalk::Error) -> i32 {
    match err {
        collwalk::Error::InvalidArgument(_) | collwalk::Error::NotACollection { .. } => 2,
        _ => 4,
    }
}

fn handle_ls(args: &LsArgs) -> i32 {
    let catalog = match load_catalog(&args.catalog) {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("Error reading catalog {}: {e}", args.catalog);
            return 4;
        }
    };

    let mut config = CursorConfig::default();
    if let Some(page_size) = args.page_size {
        config = config.with_max_rows(page_size);
    }
    let flags = args.query_flags();

    if args.recursive {
        let options = WalkOptions {
            flags,
            max_depth: args.max_depth,
            parallel: args.parallel,
            follow_links: false,
            resource_filter: args.resource.clone(),
            config,
        };
        let summary = match walk_collection(&catalog, &args.collection, &options) {
            Ok(summary) => summary,
            Err(e) => {
                eprintln!("Error: {e}");
                return exit_code_for(&e);
            }
        };

        if args.json {
            println!("{}", format_walk_json(&summary));
        } else {
            print!("{}", format_walk(&summary, flags));
        }
        return 0;
    }

    let mut handle = CollectionHandle::with_config(&catalog, config);
    handle.set_resource_filter(args.resource.as_deref());
    if let Err(e) = handle.open(&args.collection, flags) {
        eprintln!("Error: {e}");
        return exit_code_for(&e);
    }

    let mut entries = Vec::new();
    for entry in &mut handle {
        match entry {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                // Entries read before the failure are still valid.
                if !args.json {
                    print!("{}", format_listing(&args.collection, &entries, flags));
                }
                eprintln!("Error: {e}");
                return exit_code_for(&e);
            }
        }
    }

    if args.json {
        println!("{}", format_json(&args.collection, &entries));
    } else {
        print!("{}", format_listing(&args.collection, &entries, flags));
    }
    0
}

fn handle_import(args: &ImportArgs) -> i32 {
    let manifest = match load_manifest(&args.manifest) {
        Ok(manifest) => manifest,
        Err(e) => {
            eprintln!("Error reading manifest {}: {e}", args.manifest);
            return 4;
        }
    };

    let catalog = manifest.into_catalog();
    if let Err(e) = snapshot::write_snapshot(&args.snapshot, &catalog) {
        eprintln!("Error: Failed to save snapshot: {e}");
        return 4;
    }

    eprintln!(
        "Snapshot saved: {} ({} collections, {} replicas, {} special entries)",
        args.snapshot,
        catalog.collections().count(),
        catalog.replicas().len(),
        catalog.special_entries().len()
    );
    0
}

fn print_help() {
    println!("Collection listing CLI (collwalk) - List catalog-backed data grid collections");
    println!();
    println!("USAGE:");
    println!("    collwalk ls <CATALOG> <COLLECTION> [OPTIONS]");
    println!("    collwalk import <MANIFEST.json> --snapshot <FILE.parquet>");
    println!();
    println!("COMMANDS:");
    println!("    ls        List a collection from a snapshot or manifest");
    println!("    import    Convert a JSON manifest into a Parquet snapshot");
    println!();
    println!("GLOBAL OPTIONS:");
    println!("    -h, --help                 Show this help message");
    println!("    -v, --version              Show version information");
    println!();
    println!("LS OPTIONS:");
    println!("    -l, --long                Show owner, replica, resource, size and time");
    println!("    -L, --very-long           Also show checksum, data type and physical path");
    println!("    -r, --recursive           Walk sub-collections");
    println!("    --subtree                 List the whole subtree in one query");
    println!("    --data-first              List data objects before sub-collections");
    println!("    --all-replicas            Show every replica instead of one per object");
    println!("    --resource <NAME>         Only list data objects on this resource");
    println!("    --page-size <N>           Rows requested per catalog page (default: 256)");
    println!("    --max-depth <N>           Limit walk depth (with --recursive)");
    println!("    --parallel                Walk sibling sub-collections in parallel");
    println!("    --json                    Emit machine-readable output");
    println!();
    println!("EXAMPLES:");
    println!("    collwalk import grid.json --snapshot grid.parquet");
    println!("    collwalk ls grid.parquet /tempZone/home/rods -l");
    println!("    collwalk ls grid.json /tempZone/home -r --max-depth 2 --json");
}

fn print_version() {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("COLLWALK_GIT_HASH");
    const GIT_DATE: &str = env!("COLLWALK_GIT_DATE");
    const BUILD_TARGET: &str = env!("COLLWALK_BUILD_TARGET");

    println!("collwalk {VERSION}");
    println!("Commit: {GIT_HASH} ({GIT_DATE})");
    println!("Target: {BUILD_TARGET}");

    #[cfg(debug_assertions)]
    println!("Build: debug");
    #[cfg(not(debug_assertions))]
    println!("Build: release");
}
