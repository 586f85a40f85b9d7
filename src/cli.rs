//! CLI commands and argument parsing.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use crate::config::{PASSWORD_MIN_LENGTH, Triple};
use crate::container;
use crate::secret::SecretString;

const PASSWORD_ENV_VAR: &str = "NESCIENT_PASSWORD";

/// Nescient - authenticated, password-protected file containers.
#[derive(Parser)]
#[command(name = "nescient")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Pack files into authenticated .nesc containers, or unpack them back.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Pack one or more files into `.nesc` containers.
    Pack {
        /// Input file paths.
        paths: Vec<PathBuf>,

        /// Directory to write packed containers into (default: alongside input).
        #[arg(short, long)]
        outdir: Option<PathBuf>,

        /// (algorithm, mode, auth) triple, e.g. `chacha-stm-sha` or `aes256-cbc-sha`.
        #[arg(short = 'm', long, default_value = "chacha-stm-sha")]
        mode: String,

        /// Read the password from `NESCIENT_PASSWORD` instead of prompting on stdin.
        #[arg(long = "np")]
        no_prompt: bool,

        /// Delete the original file after a successful pack.
        #[arg(long = "nd")]
        delete_original: bool,

        /// Use this exact hex-encoded salt instead of a random one, for
        /// reproducible test containers. Not for normal use.
        #[arg(long = "nr", hide = true)]
        fixed_salt: Option<String>,
    },

    /// Unpack one or more `.nesc` containers.
    Unpack {
        /// Input container paths.
        paths: Vec<PathBuf>,

        /// Directory to write recovered plaintext into (default: alongside input).
        #[arg(short, long)]
        outdir: Option<PathBuf>,

        /// Read the password from `NESCIENT_PASSWORD` instead of prompting on stdin.
        #[arg(long = "np")]
        no_prompt: bool,

        /// Delete the container after a successful unpack.
        #[arg(long = "nd")]
        delete_original: bool,
    },
}

/// Parses CLI arguments.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}

/// Runs a CLI command.
pub fn run_command(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Pack { paths, outdir, mode, no_prompt, delete_original, fixed_salt } => {
            let triple = Triple::parse(&mode).ok_or_else(|| anyhow::anyhow!("unrecognised (alg, mode, auth) triple: {mode}"))?;
            let password = read_password(no_prompt)?;
            let salt = fixed_salt.map(|s| parse_fixed_salt(&s)).transpose()?;
            for path in &paths {
                pack_one(path, outdir.as_deref(), &triple, password.expose_secret(), delete_original, salt)?;
            }
            Ok(())
        }
        Commands::Unpack { paths, outdir, no_prompt, delete_original } => {
            let password = read_password(no_prompt)?;
            for path in &paths {
                unpack_one(path, outdir.as_deref(), password.expose_secret(), delete_original)?;
            }
            Ok(())
        }
    }
}

fn pack_one(path: &std::path::Path, outdir: Option<&std::path::Path>, triple: &Triple, password: &str, delete_original: bool, fixed_salt: Option<[u8; crate::config::SALT_SIZE]>) -> Result<()> {
    let destination = outdir.map_or_else(|| container::derive_output_path(path, None, true), |dir| container::derive_output_path(path, Some(dir), true));

    match fixed_salt {
        Some(salt) => {
            let plaintext = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            let container = container::pack_with_salt(&plaintext, password.as_bytes(), *triple, salt).with_context(|| format!("packing failed for {}", path.display()))?;
            container::write_atomically(&destination, &container)?;
            if delete_original {
                std::fs::remove_file(path)?;
            }
        }
        None => {
            container::pack_file(path, Some(&destination), password.as_bytes(), *triple, delete_original).with_context(|| format!("packing failed for {}", path.display()))?;
        }
    }

    println!("packed: {} -> {}", path.display(), destination.display());
    Ok(())
}

fn parse_fixed_salt(hex_str: &str) -> Result<[u8; crate::config::SALT_SIZE]> {
    let bytes = hex::decode(hex_str).context("--nr salt must be valid hex")?;
    bytes.try_into().map_err(|v: Vec<u8>| anyhow::anyhow!("--nr salt must be exactly {} bytes, got {}", crate::config::SALT_SIZE, v.len()))
}

fn unpack_one(path: &std::path::Path, outdir: Option<&std::path::Path>, password: &str, delete_original: bool) -> Result<()> {
    let out_path = outdir.map(|dir| container::derive_output_path(path, Some(dir), false));
    let destination = container::unpack_file(path, out_path.as_deref(), password.as_bytes(), delete_original).with_context(|| format!("unpacking failed for {}", path.display()))?;
    println!("unpacked: {} -> {}", path.display(), destination.display());
    Ok(())
}

fn read_password(no_prompt: bool) -> Result<SecretString> {
    let password = if no_prompt {
        std::env::var(PASSWORD_ENV_VAR).with_context(|| format!("{PASSWORD_ENV_VAR} is not set"))?
    } else {
        use std::io::Write as _;
        eprint!("password: ");
        std::io::stderr().flush().ok();
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).context("failed to read password from stdin")?;
        line.trim_end_matches(['\n', '\r']).to_owned()
    };

    if password.len() < PASSWORD_MIN_LENGTH {
        bail!("password must be at least {PASSWORD_MIN_LENGTH} characters");
    }
    Ok(SecretString::from_str(&password))
}
