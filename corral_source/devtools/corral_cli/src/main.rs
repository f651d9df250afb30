use std::env;
use std::path::{Path, PathBuf};

use corral_crawler::{Options, UnresolvedPolicy, consolidate};
use corral_fields::json::record_to_json;
use corral_ids::{RecordId, SUB_TYPE_MANIFEST, SourceKey, TypeTag};
use corral_store::{Container, ContainerSet, write_consolidated};
use serde_json::{Value as JsonValue, json};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().collect();
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let Some(command) = args.get(1).map(String::as_str) else {
        print_usage();
        std::process::exit(2);
    };

    let result = match command {
        "consolidate" => consolidate_command(&args, &cwd),
        "inspect" => inspect_command(&args, &cwd),
        _ => {
            print_usage();
            Err(format!("unknown command `{command}`"))
        }
    };

    if let Err(err) = result {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  corral_cli consolidate --path <dir> [--root <origin:id>]... [--scene <origin>]...");
    eprintln!("                         [--out <dir>] [--strict]");
    eprintln!("  corral_cli inspect --path <file.crl> [--json]");
    eprintln!();
    eprintln!("  --root   crawl from one record, repeatable");
    eprintln!("  --scene  crawl from every entity record of that container, repeatable");
    eprintln!("  --out    target directory, defaults to <path>/consolidated");
    eprintln!("  --strict fail on dangling references instead of pruning them");
}

fn parse_flag_value(args: &[String], flag: &str) -> Option<String> {
    let idx = args.iter().position(|a| a == flag)?;
    args.get(idx + 1).cloned()
}

fn parse_flag_values(args: &[String], flag: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == flag {
            if let Some(value) = iter.next() {
                values.push(value.clone());
            }
        }
    }
    values
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn parse_root(spec: &str) -> Result<SourceKey, String> {
    let Some((origin, id)) = spec.rsplit_once(':') else {
        return Err(format!("invalid root `{spec}`, expected <origin:id>"));
    };
    let record = RecordId::parse_str(id)?;
    Ok(SourceKey::new(origin, record))
}

fn consolidate_command(args: &[String], cwd: &Path) -> Result<(), String> {
    let src_dir = parse_flag_value(args, "--path")
        .map(|p| cwd.join(p))
        .unwrap_or_else(|| cwd.to_path_buf());
    let out_dir = parse_flag_value(args, "--out")
        .map(|p| cwd.join(p))
        .unwrap_or_else(|| src_dir.join("consolidated"));
    let options = Options {
        unresolved: if has_flag(args, "--strict") {
            UnresolvedPolicy::Fail
        } else {
            UnresolvedPolicy::Prune
        },
    };

    let set = ContainerSet::load_dir(&src_dir)
        .map_err(|err| format!("failed to load containers from {}: {err}", src_dir.display()))?;

    let mut roots = Vec::new();
    for spec in parse_flag_values(args, "--root") {
        roots.push(parse_root(&spec)?);
    }
    for origin in parse_flag_values(args, "--scene") {
        let container = set.get(&origin).ok_or_else(|| {
            format!(
                "no container with origin `{origin}` under {}",
                src_dir.display()
            )
        })?;
        for id in container.entity_roots() {
            roots.push(SourceKey::new(origin.as_str(), id));
        }
    }
    if roots.is_empty() {
        return Err("no roots: pass --root <origin:id> or --scene <origin>".to_string());
    }

    let consolidation =
        consolidate(&set, &roots, options).map_err(|err| format!("consolidation failed: {err}"))?;

    write_consolidated(&out_dir, &consolidation)
        .map_err(|err| format!("failed to write containers to {}: {err}", out_dir.display()))?;

    println!(
        "consolidated {} records into {} ({} scene, {} asset)",
        consolidation.remap.len(),
        out_dir.display(),
        consolidation.scene_record_count(),
        consolidation.asset_record_count()
    );
    for (source, target) in &consolidation.remap {
        println!("  {source} -> {target}");
    }
    Ok(())
}

fn inspect_command(args: &[String], cwd: &Path) -> Result<(), String> {
    let path = parse_flag_value(args, "--path")
        .map(|p| cwd.join(p))
        .ok_or_else(|| "inspect needs --path <file.crl>".to_string())?;

    let container = Container::load(&path)
        .map_err(|err| format!("failed to load {}: {err}", path.display()))?;

    if has_flag(args, "--json") {
        let records: Vec<JsonValue> = container
            .records_in_order()
            .map(|record| record_to_json(record.id, record.type_tag, &record.tree))
            .collect();
        let doc = json!({
            "origin": container.origin(),
            "externals": container.externals(),
            "records": records,
        });
        let pretty = serde_json::to_string_pretty(&doc).map_err(|err| err.to_string())?;
        println!("{pretty}");
        return Ok(());
    }

    println!(
        "{}: {} records, externals {:?}",
        container.origin(),
        container.len(),
        container.externals()
    );
    for record in container.records_in_order() {
        let kind = if record.type_tag == TypeTag::BEHAVIOR && record.sub_type == SUB_TYPE_MANIFEST {
            " (manifest)"
        } else {
            ""
        };
        println!("  record {} tag {}{kind}", record.id, record.type_tag);
        if let Err(err) = record.tree.validate() {
            println!("    invalid: {err}");
        }
    }
    Ok(())
}
