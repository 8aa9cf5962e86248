use std::sync::Arc;

use atproto_crypto::{offload, AtKeyPair, KeyAlgo, SigOpts, SignatureEncoding};
use base64::{
	alphabet,
	engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
	Engine as _,
};
use clap::Parser as _;
use color_eyre::eyre::{Result, WrapErr as _};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Standard base64. Padding is written, but optional when reading.
const BASE64: GeneralPurpose = GeneralPurpose::new(
	&alphabet::STANDARD,
	GeneralPurposeConfig::new()
		.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(clap::Parser, Debug)]
#[command(version, about)]
struct Cli {
	#[command(subcommand)]
	command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
	/// Generates a new keypair and prints its did:key.
	Generate(GenerateArgs),
	/// Prints the did:key of an existing private key.
	Did(KeyArgs),
	/// Signs a message.
	Sign(SignArgs),
	/// Verifies a signature against a did:key.
	Verify(VerifyArgs),
}

#[derive(clap::Args, Debug)]
struct GenerateArgs {
	/// `k256` or `p256`. JWT names like `ES256K` work too.
	#[clap(long, default_value = "k256")]
	algo: KeyAlgo,
	/// Also print the private key.
	#[clap(long)]
	export: bool,
}

#[derive(clap::Args, Debug)]
struct KeyArgs {
	#[clap(long, default_value = "k256")]
	algo: KeyAlgo,
	/// The private scalar, hex encoded.
	#[clap(long, env = "DIDKEY_PRIVATE_KEY_HEX", hide_env_values = true)]
	private_key_hex: String,
}

#[derive(clap::Args, Debug)]
struct SigArgs {
	/// Use DER instead of raw `r‖s` signatures.
	#[clap(long)]
	der: bool,
	/// Don't enforce low-S signatures.
	#[clap(long)]
	allow_high_s: bool,
}

impl SigArgs {
	fn opts(&self) -> SigOpts {
		let mut opts = SigOpts::CANONICAL;
		if self.der {
			opts = opts.with_encoding(SignatureEncoding::Der);
		}
		if self.allow_high_s {
			opts = opts.allow_high_s();
		}
		opts
	}
}

#[derive(clap::Args, Debug)]
struct SignArgs {
	#[clap(flatten)]
	key: KeyArgs,
	#[clap(long)]
	message: String,
	#[clap(flatten)]
	sig: SigArgs,
}

#[derive(clap::Args, Debug)]
struct VerifyArgs {
	#[clap(long)]
	did: String,
	#[clap(long)]
	message: String,
	/// Base64 encoded signature.
	#[clap(long)]
	signature: String,
	#[clap(flatten)]
	sig: SigArgs,
}

#[derive(Serialize, Debug, Eq, PartialEq)]
#[serde(untagged, rename_all_fields = "camelCase")]
enum Output {
	Key {
		algorithm: &'static str,
		did: String,
		#[serde(skip_serializing_if = "Option::is_none")]
		private_key_hex: Option<String>,
	},
	Signature {
		did: String,
		signature_base64: String,
	},
	Verification {
		did: String,
		valid: bool,
	},
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	tracing_subscriber::registry()
		.with(EnvFilter::try_from_default_env().unwrap_or("info".into()))
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();

	let cli = Cli::parse();
	debug!(command = ?cli.command, "parsed args");
	let output = run(cli.command).await?;
	println!("{}", serde_json::to_string_pretty(&output)?);
	Ok(())
}

async fn run(command: Commands) -> Result<Output> {
	Ok(match command {
		Commands::Generate(args) => {
			let pair = offload::generate(args.algo, args.export)
				.await
				.wrap_err("failed to generate keypair")?;
			info!(did = pair.did(), "generated keypair");
			let private_key_hex = if args.export {
				Some(hex::encode(pair.export()?.as_slice()))
			} else {
				None
			};
			Output::Key {
				algorithm: pair.algo().jwt_alg(),
				did: pair.did().to_owned(),
				private_key_hex,
			}
		}
		Commands::Did(args) => {
			let pair = args.load()?;
			Output::Key {
				algorithm: pair.algo().jwt_alg(),
				did: pair.did().to_owned(),
				private_key_hex: None,
			}
		}
		Commands::Sign(args) => {
			let pair = Arc::new(args.key.load()?);
			let sig = offload::sign(
				Arc::clone(&pair),
				args.message.into_bytes(),
				args.sig.opts(),
			)
			.await
			.wrap_err("failed to sign")?;
			Output::Signature {
				did: pair.did().to_owned(),
				signature_base64: BASE64.encode(sig),
			}
		}
		Commands::Verify(args) => {
			let sig = BASE64
				.decode(&args.signature)
				.wrap_err("signature was not valid base64")?;
			let valid = offload::verify_did(
				args.did.clone(),
				args.message.into_bytes(),
				sig,
				args.sig.opts(),
			)
			.await
			.wrap_err_with(|| format!("failed to verify against {}", args.did))?;
			Output::Verification {
				did: args.did,
				valid,
			}
		}
	})
}

impl KeyArgs {
	fn load(&self) -> Result<AtKeyPair> {
		AtKeyPair::import_hex(self.algo, self.private_key_hex.trim(), false)
			.wrap_err("failed to import private key")
	}
}
