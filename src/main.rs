use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use matcher::{
    display_path, match_all, Fingerprint, HashAlgorithm, MatchSet, MatcherConfig,
    ReferenceDatabase, ResultCount,
};

#[derive(Parser, Debug)]
#[command(name = "thumbnail-matcher")]
#[command(version)]
#[command(about = "Matches card thumbnails against reference fingerprints")]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generates fingerprints for a folder of reference thumbnails
    Hash {
        /// The folder containing the thumbnail images
        folder: PathBuf,

        /// The JSON file to put the fingerprints into. Defaults to the configured database
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(short, long, value_enum)]
        algorithm: Option<HashAlgorithm>,

        /// JSON config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Ranks thumbnail images against the reference database
    Match {
        /// Thumbnails cropped from a character list screenshot
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Reference database. Defaults to the configured database
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Number of matches to show per thumbnail
        #[arg(short = 'n', long, allow_negative_numbers = true)]
        top: Option<i64>,

        #[arg(short, long, value_enum)]
        algorithm: Option<HashAlgorithm>,

        /// JSON config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the match sets as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match Args::parse().command {
        Commands::Hash {
            folder,
            output,
            algorithm,
            config,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(output) = output {
                config.database = output;
            }
            if let Some(algorithm) = algorithm {
                config.algorithm = algorithm;
            }
            hash(&folder, &config)
        }
        Commands::Match {
            images,
            database,
            top,
            algorithm,
            config,
            json,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(database) = database {
                config.database = database;
            }
            if let Some(top) = top {
                config.max_results = ResultCount::try_from(top)?.get();
            }
            if let Some(algorithm) = algorithm {
                config.algorithm = algorithm;
            }
            match_images(&images, &config, json)
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<MatcherConfig> {
    let config = match path {
        Some(p) => MatcherConfig::from_file(p)?,
        None => MatcherConfig::default(),
    };
    debug!(?config, "resolved config");
    Ok(config)
}

fn fingerprint_file(path: &Path, algorithm: HashAlgorithm) -> Option<Fingerprint> {
    match image::open(path) {
        Ok(image) => {
            let fp = algorithm.fingerprint(&image);
            if fp.is_none() {
                warn!(path = %path.display(), "image is too small to fingerprint");
            }
            fp
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unable to load image");
            None
        }
    }
}

fn hash(folder: &Path, config: &MatcherConfig) -> anyhow::Result<()> {
    if !folder.is_dir() {
        bail!("Could not open input folder {}", folder.display());
    }

    info!(folder = %folder.display(), output = %config.database.display(), algorithm = ?config.algorithm, "hashing thumbnails");

    let mut db = ReferenceDatabase::new();
    for entry in fs::read_dir(folder)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(filename) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
            continue;
        };

        if let Some(fp) = fingerprint_file(&path, config.algorithm) {
            debug!(path = %path.display(), fingerprint = %fp, "hashed thumbnail");
            db.push(filename, fp)?;
        }
    }

    db.sort_by_identifier();
    db.to_file(&config.database)?;

    println!(
        "Successfully wrote {} fingerprints to {}",
        db.len(),
        config.database.display()
    );
    Ok(())
}

fn match_images(images: &[PathBuf], config: &MatcherConfig, json: bool) -> anyhow::Result<()> {
    let db = ReferenceDatabase::from_file(&config.database)
        .with_context(|| format!("loading reference database {}", config.database.display()))?;
    if db.is_empty() {
        warn!(path = %config.database.display(), "reference database is empty");
    }

    let queries = images.iter().filter_map(|path| {
        fingerprint_file(path, config.algorithm).map(|fp| (path.display().to_string(), fp))
    });
    let sets = match_all(queries, &db, config.max_results);

    if json {
        println!("{}", serde_json::to_string_pretty(&sets)?);
    } else {
        for set in &sets {
            print_match_set(set, &config.display_prefix);
        }
    }
    Ok(())
}

fn print_match_set(set: &MatchSet<String>, prefix: &str) {
    println!("{}", set.source);
    match set.best() {
        Some(best) => println!(
            "  best:  {} ({:.2}%)",
            display_path(prefix, &best.identifier),
            best.confidence * 100.0
        ),
        None => println!("  no matches"),
    }
    for other in set.others() {
        println!(
            "  other: {} ({:.2}%)",
            display_path(prefix, &other.identifier),
            other.confidence * 100.0
        );
    }
}
