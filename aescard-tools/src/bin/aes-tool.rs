// Copyright 2017 Axel Rasmussen
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use aescard::applet::util::{
    maybe_prompt, parse_hex, parse_hex_exact, to_hex, to_hex_string, to_utf8_ignoring_errors,
};
use aescard::applet::*;
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{filter::LevelFilter, prelude::*, EnvFilter};

const KEY_PROMPT: &'static str = "Enter 32-byte AES key (hex, 64 chars): ";
const IV_PROMPT: &'static str = "Enter 16-byte IV (hex, 32 chars): ";

fn new_handle(output_recording: Option<PathBuf>) -> Result<Handle<PcscHardware>> {
    match output_recording {
        None => Ok(Handle::new()?),
        Some(output_recording) => Ok(Handle::new_with_hal(PcscHardware::new_with_recording(
            output_recording,
        )?)),
    }
}

fn connect(reader: &str, output_recording: Option<PathBuf>) -> Result<Handle<PcscHardware>> {
    let mut handle = new_handle(output_recording)?;
    let result = handle.connect(Some(reader));
    if let Some(reader) = handle.reader() {
        println!("Using reader: {}", reader);
    }
    print_transcript(&mut handle);
    result?;
    Ok(handle)
}

fn print_transcript(handle: &mut Handle<PcscHardware>) {
    for exchange in handle.take_transcript() {
        println!("{}", exchange);
    }
}

fn set_key_and_iv(
    handle: &mut Handle<PcscHardware>,
    key: Option<&str>,
    iv: Option<&str>,
) -> Result<()> {
    let key = parse_hex_exact("key", &maybe_prompt(key, KEY_PROMPT, true)?, KEY_BYTES)?;
    let iv = parse_hex_exact("IV", &maybe_prompt(iv, IV_PROMPT, false)?, IV_BYTES)?;

    let result = handle.set_key(&key).and_then(|_| handle.set_iv(&iv));
    print_transcript(handle);
    Ok(result?)
}

fn encrypt_with(handle: &mut Handle<PcscHardware>, plaintext: Option<&str>) -> Result<()> {
    let plaintext = maybe_prompt(plaintext, "Enter plaintext: ", false)?;
    let result = handle.encrypt(plaintext.as_bytes());
    print_transcript(handle);
    println!("Ciphertext (hex): {}", to_hex_string(&result?));
    Ok(())
}

fn decrypt_with(handle: &mut Handle<PcscHardware>, ciphertext: Option<&str>) -> Result<()> {
    let ciphertext = maybe_prompt(ciphertext, "Enter ciphertext (hex): ", false)?;
    let ciphertext = parse_hex(&ciphertext)?;
    let result = handle.decrypt(&ciphertext);
    print_transcript(handle);
    println!("Plaintext: {}", to_utf8_ignoring_errors(&result?));
    Ok(())
}

fn list_readers(output_recording: Option<PathBuf>) -> Result<()> {
    let handle = new_handle(output_recording)?;
    let readers: Vec<String> = handle.list_readers()?;
    for reader in readers {
        println!("{}", reader);
    }
    Ok(())
}

fn interactive(reader: String, output_recording: Option<PathBuf>) -> Result<()> {
    let mut handle = connect(&reader, output_recording)?;
    set_key_and_iv(&mut handle, None, None)?;

    let action = maybe_prompt(None, "Choose action (encrypt/decrypt): ", false)?;
    match action.trim().to_lowercase().as_str() {
        "encrypt" => encrypt_with(&mut handle, None),
        "decrypt" => decrypt_with(&mut handle, None),
        other => {
            debug!("Rejected action '{}'", other);
            println!("Invalid action. Please choose 'encrypt' or 'decrypt'.");
            Ok(())
        }
    }
}

fn encrypt(
    reader: String,
    output_recording: Option<PathBuf>,
    key: Option<String>,
    iv: Option<String>,
    plaintext: Option<String>,
) -> Result<()> {
    let mut handle = connect(&reader, output_recording)?;
    set_key_and_iv(&mut handle, key.as_deref(), iv.as_deref())?;
    encrypt_with(&mut handle, plaintext.as_deref())
}

fn decrypt(
    reader: String,
    output_recording: Option<PathBuf>,
    key: Option<String>,
    iv: Option<String>,
    ciphertext: Option<String>,
) -> Result<()> {
    let mut handle = connect(&reader, output_recording)?;
    set_key_and_iv(&mut handle, key.as_deref(), iv.as_deref())?;
    decrypt_with(&mut handle, ciphertext.as_deref())
}

fn generate_key() -> Result<()> {
    let mut key = [0_u8; KEY_BYTES];
    aescard::crypto::random_bytes(&mut key)?;
    let mut iv = [0_u8; IV_BYTES];
    aescard::crypto::random_bytes(&mut iv)?;
    println!("Key: {}", to_hex(&key));
    println!("IV: {}", to_hex(&iv));
    Ok(())
}

fn self_test(reader: String, output_recording: Option<PathBuf>, length: usize) -> Result<()> {
    let mut handle = connect(&reader, output_recording)?;
    let result = handle.self_test(length);
    print_transcript(&mut handle);
    result?;
    println!("Self test passed.");
    Ok(())
}

#[derive(Args)]
// Arguments common to all commands.
struct CommonArgs {
    #[arg(long)]
    /// Record interactions with the hardware, and write it to this file.
    output_recording: Option<PathBuf>,
}

#[derive(Args)]
// Arguments to select which PC/SC reader to use.
struct ReaderArgs {
    #[arg(short = 'r', long, default_value_t = DEFAULT_READER.to_string())]
    /// The PC/SC reader to use. Try list-readers for possible values. The first reader with
    /// the value given here as a substring is used.
    reader: String,
}

#[derive(Args)]
// The key and IV to load into the applet. Either one is prompted for if omitted.
struct KeyArgs {
    #[arg(short = 'k', long)]
    /// The 32-byte AES key, in hex.
    key: Option<String>,

    #[arg(short = 'i', long)]
    /// The 16-byte CBC IV, in hex.
    iv: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available PC/SC readers.
    ListReaders {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Prompt for a key, IV, and action, and run it on the card. This is the default.
    Interactive {
        #[command(flatten)]
        reader: ReaderArgs,
        #[command(flatten)]
        common: CommonArgs,
    },

    /// PKCS#7 pad and encrypt a message on the card.
    Encrypt {
        #[command(flatten)]
        reader: ReaderArgs,
        #[command(flatten)]
        keys: KeyArgs,

        #[arg(short = 'p', long)]
        /// The message to encrypt.
        plaintext: Option<String>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Decrypt a message on the card, and strip its PKCS#7 padding.
    Decrypt {
        #[command(flatten)]
        reader: ReaderArgs,
        #[command(flatten)]
        keys: KeyArgs,

        #[arg(short = 'c', long)]
        /// The ciphertext to decrypt, in hex.
        ciphertext: Option<String>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Print a random key and IV, suitable for use with encrypt and decrypt.
    GenerateKey,

    /// Compare the card's AES-256-CBC against OpenSSL, using a random key, IV, and message.
    SelfTest {
        #[command(flatten)]
        reader: ReaderArgs,

        #[arg(short = 'l', long, default_value_t = 100)]
        /// The length of the random message, in bytes.
        length: usize,

        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Parser)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(
                    if cfg!(debug_assertions) {
                        LevelFilter::DEBUG
                    } else {
                        LevelFilter::WARN
                    }
                    .into(),
                )
                .from_env()?,
        )
        .init();

    aescard::init()?;

    match Cli::parse().command {
        None => interactive(DEFAULT_READER.to_string(), None),
        Some(Commands::ListReaders { common }) => list_readers(common.output_recording),
        Some(Commands::Interactive { reader, common }) => {
            interactive(reader.reader, common.output_recording)
        }
        Some(Commands::Encrypt {
            reader,
            keys,
            plaintext,
            common,
        }) => encrypt(
            reader.reader,
            common.output_recording,
            keys.key,
            keys.iv,
            plaintext,
        ),
        Some(Commands::Decrypt {
            reader,
            keys,
            ciphertext,
            common,
        }) => decrypt(
            reader.reader,
            common.output_recording,
            keys.key,
            keys.iv,
            ciphertext,
        ),
        Some(Commands::GenerateKey) => generate_key(),
        Some(Commands::SelfTest {
            reader,
            length,
            common,
        }) => self_test(reader.reader, common.output_recording, length),
    }
}
