//! CLI argument parsing

use crate::services::cursor::QueryFlags;

#[derive(Debug, Clone)]
pub struct CliArgs {
    pub command: Command,
}

#[derive(Debug, Clone)]
pub enum Command {
    Ls(LsArgs),
    Import(ImportArgs),
}

#[derive(Debug, Clone, Default)]
pub struct LsArgs {
    pub catalog: String,
    pub collection: String,
    pub long: bool,
    pub very_long: bool,
    /// Walk sub-collections, one listing per collection.
    pub recursive: bool,
    /// Ask the catalog for the whole subtree in a single listing.
    pub subtree: bool,
    pub data_first: bool,
    pub all_replicas: bool,
    pub resource: Option<String>,
    pub page_size: Option<usize>,
    pub max_depth: Option<u16>,
    pub parallel: bool,
    pub json: bool,
}

impl LsArgs {
    /// Cursor flags implied by the options.
    #[must_use]
    pub fn query_flags(&self) -> QueryFlags {
        let mut flags = QueryFlags::from_verbosity(self.long, self.very_long);
        flags.set(QueryFlags::RECURSIVE_QUERY, self.subtree);
        flags.set(QueryFlags::DATA_FIRST, self.data_first);
        flags.set(QueryFlags::NO_TRIM_REPLICAS, self.all_replicas);
        flags.set(QueryFlags::INCLUDE_EXTRA_CONDITIONS, self.resource.is_some());
        flags
    }
}

#[derive(Debug, Clone)]
pub struct ImportArgs {
    pub manifest: String,
    pub snapshot: String,
}

/// Parse command line arguments
pub fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    if args.len() < 2 {
        return Err("No command specified".to_string());
    }

    let command = match args[1].as_str() {
        "ls" => Command::Ls(parse_ls_args(&args[2..])?),
        "import" => Command::Import(parse_import_args(&args[2..])?),
        _ => return Err(format!("Unknown command: {}", args[1])),
    };

    Ok(CliArgs { command })
}

fn option_value<'a>(args: &'a [String], i: usize, name: &str) -> Result<&'a str, String> {
    args.get(i)
        .map(String::as_str)
        .ok_or_else(|| format!("{name} requires a value"))
}

fn parse_ls_args(args: &[String]) -> Result<LsArgs, String> {
    let mut ls_args = LsArgs::default();
    let mut positional = Vec::new();
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "-l" | "--long" => ls_args.long = true,
            "-L" | "--very-long" => ls_args.very_long = true,
            "-r" | "--recursive" => ls_args.recursive = true,
            "--subtree" => ls_args.subtree = true,
            "--data-first" => ls_args.data_first = true,
            "--all-replicas" => ls_args.all_replicas = true,
            "--parallel" => ls_args.parallel = true,
            "--json" => ls_args.json = true,
            "--resource" => {
                i += 1;
                ls_args.resource = Some(option_value(args, i, "--resource")?.to_string());
            }
            "--page-size" => {
                i += 1;
                let size: usize = option_value(args, i, "--page-size")?
                    .parse()
                    .map_err(|_| "--page-size must be a positive integer".to_string())?;
                if size == 0 {
                    return Err("--page-size must be greater than zero".to_string());
                }
                ls_args.page_size = Some(size);
            }
            "--max-depth" => {
                i += 1;
                ls_args.max_depth = Some(
                    option_value(args, i, "--max-depth")?
                        .parse()
                        .map_err(|_| "--max-depth must be a number".to_string())?,
                );
            }
            arg if !arg.starts_with('-') || arg == "-" => positional.push(arg.to_string()),
            _ => return Err(format!("Unknown option: {}", args[i])),
        }
        i += 1;
    }

    let mut positional = positional.into_iter();
    ls_args.catalog = positional
        .next()
        .ok_or_else(|| "Missing required argument: CATALOG".to_string())?;
    ls_args.collection = positional
        .next()
        .ok_or_else(|| "Missing required argument: COLLECTION".to_string())?;
    if let Some(extra) = positional.next() {
        return Err(format!("Unexpected argument: {extra}"));
    }

    if ls_args.subtree && ls_args.recursive {
        return Err("--subtree and --recursive cannot be combined".to_string());
    }
    if (ls_args.max_depth.is_some() || ls_args.parallel) && !ls_args.recursive {
        return Err("--max-depth and --parallel require --recursive".to_string());
    }

    Ok(ls_args)
}

fn parse_import_args(args: &[String]) -> Result<ImportArgs, String> {
    let mut manifest = None;
    let mut snapshot = None;
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "--snapshot" => {
                i += 1;
                snapshot = Some(option_value(args, i, "--snapshot")?.to_string());
            }
            arg if !arg.starts_with("--") => {
                if manifest.is_some() {
                    return Err(format!("Unexpected argument: {arg}"));
                }
                manifest = Some(arg.to_string());
            }
            _ => return Err(format!("Unknown option: {}", args[i])),
        }
        i += 1;
    }

    Ok(ImportArgs {
        manifest: manifest.ok_or_else(|| "Missing required argument: MANIFEST".to_string())?,
        snapshot: snapshot.ok_or_else(|| "--snapshot is required for import".to_string())?,
    })
}
