use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use sealbox::file_ops;
use sealbox::kdf::DEFAULT_ITERATIONS;
use sealbox::passphrase::{self, PassphraseReader};
use sealbox::{
    CompressionAlgorithm, CompressionLevel, EncryptionAlgorithm, KdfAlgorithm, SealOptions,
    Sealbox,
};

#[derive(Parser, Debug)]
#[command(name = "sealbox", version, about = "compress and password-seal data", disable_version_flag = true)]
struct Cli {
    /// Read password from stdin instead of from terminal
    #[arg(long = "passphrase-stdin", action = ArgAction::SetTrue, global = true)]
    passphrase_stdin: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compress and encrypt a file into a sealed blob
    Seal {
        /// Path to the file whose contents is to be sealed
        #[arg(short = 'i', long = "input")]
        input: PathBuf,
        /// Path to the file to write the sealed blob to
        #[arg(short = 'o', long = "output")]
        output: PathBuf,
        /// Compression algorithm; auto measures every algorithm and keeps
        /// the smallest output
        #[arg(long, value_enum, default_value_t = CompressionArg::Auto)]
        compression: CompressionArg,
        /// Compression level, 1 (fastest) through 9 (smallest)
        #[arg(long, default_value_t = 6)]
        level: u8,
        /// Encryption algorithm
        #[arg(long, value_enum, default_value_t = CipherArg::Aes256Gcm)]
        cipher: CipherArg,
        /// Key derivation function
        #[arg(long, value_enum, default_value_t = KdfArg::Pbkdf2)]
        kdf: KdfArg,
        /// KDF iteration count
        #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
        iterations: u32,
        /// Write armored text instead of the raw binary blob
        #[arg(long, action = ArgAction::SetTrue)]
        armor: bool,
    },
    /// Decrypt and decompress a sealed file
    ///
    /// All parameters are read from the blob; only the password is needed.
    Open {
        /// Path to the sealed file (raw or armored)
        #[arg(short = 'i', long = "input")]
        input: PathBuf,
        /// Path to the file to write the plaintext to
        #[arg(short = 'o', long = "output")]
        output: PathBuf,
    },
    /// Replace a sealed file's contents, keeping its password
    Update {
        /// Path to the file whose contents is to be sealed
        #[arg(short = 'i', long = "input")]
        input: PathBuf,
        /// Path to the existing sealed file to replace
        #[arg(short = 'o', long = "output")]
        output: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CompressionArg {
    Auto,
    Store,
    Zlib,
    Lzma,
    Brotli,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CipherArg {
    #[value(name = "aes256-gcm")]
    Aes256Gcm,
    #[value(name = "chacha20-poly1305")]
    ChaCha20Poly1305,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KdfArg {
    Pbkdf2,
    Scrypt,
    Argon2id,
}

fn seal_options(
    compression: CompressionArg,
    level: u8,
    cipher: CipherArg,
    kdf: KdfArg,
    iterations: u32,
) -> sealbox::Result<SealOptions> {
    let (algorithm, auto_select) = match compression {
        CompressionArg::Auto => (CompressionAlgorithm::Zlib, true),
        CompressionArg::Store => (CompressionAlgorithm::Store, false),
        CompressionArg::Zlib => (CompressionAlgorithm::Zlib, false),
        CompressionArg::Lzma => (CompressionAlgorithm::Lzma, false),
        CompressionArg::Brotli => (CompressionAlgorithm::Brotli, false),
    };
    Ok(SealOptions {
        compression: algorithm,
        level: CompressionLevel::new(level)?,
        auto_select,
        cipher: match cipher {
            CipherArg::Aes256Gcm => EncryptionAlgorithm::Aes256Gcm,
            CipherArg::ChaCha20Poly1305 => EncryptionAlgorithm::ChaCha20Poly1305,
        },
        kdf: match kdf {
            KdfArg::Pbkdf2 => KdfAlgorithm::Pbkdf2HmacSha256,
            KdfArg::Scrypt => KdfAlgorithm::Scrypt,
            KdfArg::Argon2id => KdfAlgorithm::Argon2id,
        },
        iterations,
    })
}

fn run(cli: Cli) -> sealbox::Result<()> {
    let mut reader: Box<dyn PassphraseReader> = if cli.passphrase_stdin {
        Box::new(passphrase::ReaderPassphraseReader::new(Box::new(
            std::io::stdin(),
        )))
    } else {
        Box::new(passphrase::TerminalPassphraseReader::new())
    };

    match cli.command {
        Some(Commands::Seal {
            input,
            output,
            compression,
            level,
            cipher,
            kdf,
            iterations,
            armor,
        }) => {
            let options = seal_options(compression, level, cipher, kdf, iterations)?;
            let sealbox = Sealbox::new(options)?;
            file_ops::seal_file(&sealbox, &input, &output, reader.as_mut(), armor)
        }
        Some(Commands::Open { input, output }) => {
            let sealbox = Sealbox::new(SealOptions::default())?;
            file_ops::open_file(&sealbox, &input, &output, reader.as_mut())
        }
        Some(Commands::Update { input, output }) => {
            let sealbox = Sealbox::new(SealOptions::default())?;
            file_ops::update_file(&sealbox, &input, &output, reader.as_mut())
        }
        None => Err(sealbox::SealboxError::new(
            sealbox::ErrorCategory::User,
            "command is required; use --help to see list of commands",
        )),
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprint!("{}", err);
        let mut source: Option<&dyn std::error::Error> =
            err.source_error().map(|e| e as &dyn std::error::Error);
        while let Some(cause) = source {
            eprint!(": {}", cause);
            source = cause.source();
        }
        eprintln!();
        std::process::exit(1);
    }
}
