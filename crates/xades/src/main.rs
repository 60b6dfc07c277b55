#![forbid(unsafe_code)]

//! xades CLI: XAdES-BES enveloped signing with a PKCS#12 bundle.

use base64::Engine;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use xades::core::algorithm;
use xades::xml::xpath::{self, ReferenceTarget};
use xades::xml::XmlDocument;
use xades::{DataObjectFormat, Error, SignOptions};

#[derive(Parser)]
#[command(
    name = "xades",
    about = "XAdES-BES enveloped XML signatures (RSA, Exclusive C14N, PKCS#12)",
    version
)]
struct Cli {
    /// Log pipeline steps to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append an enveloped XAdES-BES signature to an XML document
    Sign {
        /// Input XML file
        file: PathBuf,

        /// PKCS#12 bundle holding the RSA key and certificates
        #[arg(short = 'p', long = "p12")]
        p12: PathBuf,

        /// Passphrase of the PKCS#12 bundle
        #[arg(long, env = "XADES_PASSPHRASE", default_value = "", hide_env_values = true)]
        passphrase: String,

        /// Reference URI to sign: "" (whole document) or "#id"
        #[arg(short, long, default_value = "")]
        target: String,

        /// Digest algorithm URI
        #[arg(long, default_value = algorithm::DEFAULT_DIGEST)]
        digest: String,

        /// Signature algorithm URI
        #[arg(long = "signature-method", default_value = algorithm::DEFAULT_SIGNATURE)]
        signature_method: String,

        /// Canonicalization algorithm URI for SignedInfo
        #[arg(long, default_value = algorithm::DEFAULT_C14N)]
        c14n: String,

        /// Fixed SigningTime (RFC 3339, converted to UTC)
        #[arg(long = "signing-time", value_parser = parse_signing_time)]
        signing_time: Option<DateTime<Utc>>,

        /// Seed for reproducible Id generation
        #[arg(long = "id-seed")]
        id_seed: Option<u64>,

        /// Register additional ID attribute names
        #[arg(long = "id-attr")]
        id_attr: Vec<String>,

        /// Id of the payload reference, described by DataObjectFormat
        #[arg(long = "reference-id")]
        reference_id: Option<String>,

        /// DataObjectFormat/Description
        #[arg(long, requires = "reference_id")]
        description: Option<String>,

        /// DataObjectFormat/ObjectIdentifier/Identifier
        #[arg(long = "object-identifier", requires = "reference_id")]
        object_identifier: Option<String>,

        /// DataObjectFormat/MimeType
        #[arg(long = "mime-type", requires = "reference_id")]
        mime_type: Option<String>,

        /// DataObjectFormat/Encoding
        #[arg(long, requires = "reference_id")]
        encoding: Option<String>,

        /// Do not sign the KeyInfo element
        #[arg(long = "no-key-info-reference")]
        no_key_info_reference: bool,

        /// Attest the CA certificates of the bundle in SigningCertificate
        #[arg(long = "attest-chain")]
        attest_chain: bool,

        /// Embed the chain certificates in X509Data
        #[arg(long = "include-chain")]
        include_chain: bool,

        /// List Exclusive C14N explicitly on every reference
        #[arg(long = "explicit-c14n")]
        explicit_c14n: bool,

        /// Extra payload transform URI, applied after enveloped-signature
        #[arg(long = "transform")]
        transform: Vec<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the base64 digest of a reference, as a signature would record it
    Digest {
        /// Input XML file
        file: PathBuf,

        /// Reference URI: "" (whole document) or "#id"
        #[arg(short, long, default_value = "")]
        uri: String,

        /// Digest algorithm URI
        #[arg(long, default_value = algorithm::DEFAULT_DIGEST)]
        digest: String,

        /// Register additional ID attribute names
        #[arg(long = "id-attr")]
        id_attr: Vec<String>,
    },

    /// Write the Exclusive C14N form of a reference
    C14n {
        /// Input XML file
        file: PathBuf,

        /// Reference URI: "" (whole document) or "#id"
        #[arg(short, long, default_value = "")]
        uri: String,

        /// Register additional ID attribute names
        #[arg(long = "id-attr")]
        id_attr: Vec<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List supported algorithms
    Info,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Sign {
            file,
            p12,
            passphrase,
            target,
            digest,
            signature_method,
            c14n,
            signing_time,
            id_seed,
            id_attr,
            reference_id,
            description,
            object_identifier,
            mime_type,
            encoding,
            no_key_info_reference,
            attest_chain,
            include_chain,
            explicit_c14n,
            transform,
            output,
        } => {
            let mut options = SignOptions {
                digest_algorithm: digest,
                signature_algorithm: signature_method,
                canonicalization_algorithm: c14n,
                signing_time,
                id_seed,
                extra_transforms: transform,
                key_info_reference: !no_key_info_reference,
                attest_chain,
                include_chain,
                explicit_c14n_transform: explicit_c14n,
                ..SignOptions::default()
            };
            for attr in &id_attr {
                options.add_id_attr(attr);
            }
            if let Some(reference_id) = reference_id {
                options = options.with_data_object_format(
                    reference_id,
                    DataObjectFormat {
                        description,
                        object_identifier,
                        mime_type,
                        encoding,
                    },
                );
            }
            cmd_sign(&file, &p12, &passphrase, &target, &options, output)
        }

        Commands::Digest {
            file,
            uri,
            digest,
            id_attr,
        } => cmd_digest(&file, &uri, &digest, &id_attr),

        Commands::C14n {
            file,
            uri,
            id_attr,
            output,
        } => cmd_c14n(&file, &uri, &id_attr, output),

        Commands::Info => cmd_info(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn parse_signing_time(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("invalid RFC 3339 time {s:?}: {e}"))
}

fn cmd_sign(
    file: &Path,
    p12: &Path,
    passphrase: &str,
    target: &str,
    options: &SignOptions,
    output: Option<PathBuf>,
) -> Result<(), Error> {
    let xml = read_file(file)?;
    let bundle = read_file(p12)?;
    tracing::debug!(file = %file.display(), target, "signing");

    let signed = xades::sign(&xml, &bundle, passphrase, target, options)?;
    write_output(output, &signed)
}

fn cmd_digest(file: &Path, uri: &str, digest_uri: &str, id_attr: &[String]) -> Result<(), Error> {
    xades::crypto::digest::check_uri(digest_uri)?;
    let octets = reference_octets(file, uri, id_attr)?;
    let digest = xades::crypto::digest::digest(digest_uri, &octets)?;
    println!("{}", base64::engine::general_purpose::STANDARD.encode(digest));
    Ok(())
}

fn cmd_c14n(file: &Path, uri: &str, id_attr: &[String], output: Option<PathBuf>) -> Result<(), Error> {
    let octets = reference_octets(file, uri, id_attr)?;
    write_output(output, &octets)
}

/// Dereference `uri` in `file` and canonicalize the node set.
fn reference_octets(file: &Path, uri: &str, id_attr: &[String]) -> Result<Vec<u8>, Error> {
    let document = XmlDocument::parse_bytes(&read_file(file)?)?.with_id_attrs(id_attr);
    if let ReferenceTarget::Element { id, .. } = xpath::parse_reference_uri(uri)? {
        document.require_unique_id(id)?;
    }
    let doc = document.parse_doc()?;
    let id_map = document.build_id_map(&doc);
    let node_set = xades::transforms::resolve_uri(uri, &doc, &id_map)?;
    xades::transforms::TransformPipeline::new().apply(&doc, node_set)
}

fn cmd_info() -> Result<(), Error> {
    println!("xades {}: XAdES-BES enveloped signatures", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Digest algorithms:");
    for uri in [
        algorithm::SHA1,
        algorithm::SHA224,
        algorithm::SHA256,
        algorithm::SHA384,
        algorithm::SHA512,
        algorithm::MD5,
    ] {
        println!("  {uri}");
    }
    println!();
    println!("Signature algorithms (RSA PKCS#1 v1.5):");
    for uri in [
        algorithm::RSA_SHA1,
        algorithm::RSA_SHA224,
        algorithm::RSA_SHA256,
        algorithm::RSA_SHA384,
        algorithm::RSA_SHA512,
    ] {
        println!("  {uri}");
    }
    println!();
    println!("Canonicalization and transforms:");
    for uri in [
        algorithm::EXC_C14N,
        algorithm::EXC_C14N_WITH_COMMENTS,
        algorithm::ENVELOPED_SIGNATURE,
    ] {
        println!("  {uri}");
    }
    println!();
    println!("Key containers:");
    println!("  PKCS#12 (PBES2 PBKDF2/AES-CBC, PBE SHA-1/3DES; HMAC-SHA1/SHA-256 MAC)");
    Ok(())
}

// ── Utility functions ────────────────────────────────────────────────

fn read_file(path: &Path) -> Result<Vec<u8>, Error> {
    std::fs::read(path).map_err(|e| with_path(path, e))
}

fn write_output(path: Option<PathBuf>, data: &[u8]) -> Result<(), Error> {
    match path {
        Some(p) => std::fs::write(&p, data).map_err(|e| with_path(&p, e)),
        None => {
            use std::io::Write;
            let mut stdout = std::io::stdout();
            stdout.write_all(data)?;
            stdout.flush()?;
            Ok(())
        }
    }
}

fn with_path(path: &Path, e: std::io::Error) -> Error {
    Error::Io(std::io::Error::new(e.kind(), format!("{}: {e}", path.display())))
}
