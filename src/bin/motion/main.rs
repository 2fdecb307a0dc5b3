//! motion-cli - Tool for inspecting and re-compressing motion table containers.

use motion_tables::codec::{self, DATASET_NAME};
use motion_tables::container::{ContainerFile, Filter, LinkKind};
use motion_tables::{MotionClip, Result, DEFAULT_COMPRESSION_LEVEL};
use std::env;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut level = "info";
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => level = "debug",
            "-vv" | "--trace" => level = "trace",
            "-q" | "--quiet" => level = "off",
            _ => filtered_args.push(arg),
        }
    }
    init_logging(level);

    if filtered_args.is_empty() {
        print_help();
        return ExitCode::SUCCESS;
    }

    let result = match filtered_args[0] {
        "info" | "i" => match filtered_args.get(1) {
            Some(file) => cmd_info(file),
            None => return usage("info <file>"),
        },

        "dump" | "d" => {
            let json = filtered_args.iter().any(|&s| s == "--json" || s == "-j");
            let positional: Vec<&str> = filtered_args[1..]
                .iter()
                .copied()
                .filter(|&s| s != "--json" && s != "-j")
                .collect();
            match positional.first() {
                Some(file) => cmd_dump(file, positional.get(1).copied(), json),
                None => return usage("dump <file> [table] [--json]"),
            }
        }

        "recompress" | "r" => {
            let mut compression = DEFAULT_COMPRESSION_LEVEL;
            let mut positional = Vec::new();
            let mut rest = filtered_args[1..].iter();
            while let Some(&arg) = rest.next() {
                if arg == "--level" || arg == "-l" {
                    match rest.next().and_then(|s| s.parse().ok()) {
                        Some(n) => compression = n,
                        None => return usage("recompress <in> <out> [--level 1-9]"),
                    }
                } else {
                    positional.push(arg);
                }
            }
            match positional.as_slice() {
                [input, output] => cmd_recompress(input, output, compression),
                _ => return usage("recompress <in> <out> [--level 1-9]"),
            }
        }

        "version" | "--version" | "-V" => {
            print_version();
            Ok(())
        }

        "help" | "h" | "--help" | "-h" => {
            print_help();
            Ok(())
        }

        // A bare file path is treated as 'info'
        other if std::path::Path::new(other).is_file() => cmd_info(other),

        other => {
            eprintln!("Error: unknown command '{}'", other);
            eprintln!("Run 'motion-cli help' for usage");
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn usage(args: &str) -> ExitCode {
    eprintln!("Error: missing or invalid arguments");
    eprintln!("Usage: motion-cli {}", args);
    ExitCode::FAILURE
}

fn print_version() {
    println!(
        "motion-cli {} (built {} {})",
        env!("CARGO_PKG_VERSION"),
        env!("MOTION_TABLES_BUILD_DATE"),
        env!("MOTION_TABLES_BUILD_TIME")
    );
}

fn print_help() {
    println!("motion-cli - motion table container toolkit");
    println!();
    println!("USAGE:");
    println!("    motion-cli [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    i, info       <file>                    Show tables, shapes and storage settings");
    println!("    d, dump       <file> [table] [--json]   Print table values");
    println!("    r, recompress <in> <out> [--level N]    Re-write at another deflate level (default 6)");
    println!("    version                                 Show version and build date");
    println!("    h, help                                 Show this help");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose    Show debug output");
    println!("    -vv, --trace     Show trace output");
    println!("    -q, --quiet      Suppress log output");
    println!();
    println!("EXAMPLES:");
    println!("    motion-cli info walk.mtb");
    println!("    motion-cli dump walk.mtb hips --json");
    println!("    motion-cli recompress walk.mtb walk9.mtb --level 9");
    println!();
    println!("NOTES:");
    println!("    - Passing a file directly is equivalent to 'info'");
    println!("    - RUST_LOG overrides the log level flags");
}

fn cmd_info(path: &str) -> Result<()> {
    let file = ContainerFile::open(path)?;
    let root = file.root();

    println!("File:     {}", path);
    println!("Version:  {}", file.version());
    println!("Size:     {} bytes", file.size());
    println!("Groups:   {}", root.num_links());

    let mut frames = 0u64;
    for index in 0..root.num_links() {
        let name = root.link_name(index)?;
        if root.link_kind(index)? != LinkKind::Group {
            println!("  {:<24} (dataset at root, ignored)", name);
            continue;
        }
        let dataset = match root.open_group(name).and_then(|g| g.open_dataset(DATASET_NAME)) {
            Ok(d) => d,
            Err(e) => {
                println!("  {:<24} <unreadable: {}>", name, e);
                continue;
            }
        };

        frames = frames.max(dataset.space().dim(0).unwrap_or(0));
        let chunk = dataset
            .chunk()
            .map(|c| format!("{:?}", c))
            .unwrap_or_else(|| "contiguous".to_string());
        let filters: Vec<String> = dataset
            .filters()
            .iter()
            .map(|f| match f {
                Filter::Deflate(level) => format!("deflate({})", level),
            })
            .collect();
        println!(
            "  {:<24} {} {:<12} chunk {:<10} {}",
            name,
            dataset.datatype(),
            dataset.space().to_string(),
            chunk,
            if filters.is_empty() { "uncompressed".to_string() } else { filters.join(", ") }
        );
    }

    let clip_seconds = frames as f64 / motion_tables::core::FPS;
    println!("Frames:   {} ({:.3}s at {} fps)", frames, clip_seconds, motion_tables::core::FPS);
    Ok(())
}

fn cmd_dump(path: &str, table: Option<&str>, json: bool) -> Result<()> {
    let tables = codec::decode(path)?;
    let selected: Vec<(&String, &codec::Table)> = tables
        .iter()
        .filter(|(name, _)| table.map_or(true, |t| name.as_str() == t))
        .collect();

    if let Some(t) = table {
        if selected.is_empty() {
            return Err(motion_tables::Error::LinkNotFound(t.to_string()));
        }
    }

    if json {
        let mut map = serde_json::Map::new();
        for (name, rows) in &selected {
            map.insert(
                name.to_string(),
                serde_json::json!({
                    "rows": rows.len(),
                    "cols": rows.first().map_or(0, Vec::len),
                    "values": rows,
                }),
            );
        }
        let doc = serde_json::json!({ "file": path, "tables": map });
        let text = serde_json::to_string_pretty(&doc).map_err(|e| motion_tables::Error::other(e.to_string()))?;
        println!("{}", text);
        return Ok(());
    }

    for (name, rows) in selected {
        println!("{} [{} x {}]", name, rows.len(), rows.first().map_or(0, Vec::len));
        for (i, row) in rows.iter().enumerate() {
            let values: Vec<String> = row.iter().map(|v| format!("{:.6}", v)).collect();
            println!("  {:>6}: {}", i, values.join(" "));
        }
    }
    Ok(())
}

fn cmd_recompress(input: &str, output: &str, level: u32) -> Result<()> {
    let clip = MotionClip::open(input)?;
    clip.save_with_level(output, level)?;

    let before = std::fs::metadata(input)?.len();
    let after = std::fs::metadata(output)?.len();
    println!(
        "{} -> {}: {} tables, {} frames, {} -> {} bytes (level {})",
        input,
        output,
        clip.tables().len(),
        clip.total_frames(),
        before,
        after,
        level
    );
    Ok(())
}
