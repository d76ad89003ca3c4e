//! Share secrets with GitHub users, encrypted for their public SSH key
use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use ghkeys::{KeyFetcher, KeySelection, RsaPrivateKey, RsaPublicKey};
use tracing::debug;

/// RSA-OAEP encrypt stdin for a GitHub user, or decrypt it with your key
#[derive(Parser, Debug)]
#[clap(name = "ghsshare", version, about)]
pub struct Args {
    /// GitHub's API endpoint (for use with enterprise setups)
    #[clap(
        long,
        value_name = "URL",
        env = "GHSSHARE_GITHUB_API_ENDPOINT",
        default_value = ghkeys::DEFAULT_ENDPOINT
    )]
    pub github_api_endpoint: String,

    /// The private key file used to decrypt [default: ~/.ssh/id_rsa]
    #[clap(long, value_name = "PATH", env = "GHSSHARE_PRIVATE_KEY")]
    pub private_key: Option<PathBuf>,

    /// Decrypt the input instead of encrypting
    #[clap(long)]
    pub decrypt: bool,

    /// Encrypt for the key with this id instead of the user's first key
    #[clap(long, value_name = "ID", conflicts_with = "decrypt")]
    pub key_id: Option<u64>,

    /// Log debug output to stderr
    #[clap(short, long)]
    pub verbose: bool,

    /// GitHub user to encrypt for
    #[clap(value_name = "USERNAME", required_unless_present = "decrypt")]
    pub username: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Mode<'a> {
    Encrypt {
        username: &'a str,
        selection: KeySelection,
    },
    Decrypt,
}

impl Args {
    pub fn mode(&self) -> Result<Mode<'_>> {
        if self.decrypt {
            return Ok(Mode::Decrypt);
        }
        let username = self
            .username
            .as_deref()
            .ok_or_else(|| anyhow!("a username is required to encrypt"))?;
        Ok(Mode::Encrypt {
            username,
            selection: self.key_selection(),
        })
    }

    pub fn key_selection(&self) -> KeySelection {
        self.key_id.map_or(KeySelection::First, KeySelection::Id)
    }

    pub fn private_key_path(&self) -> Result<PathBuf> {
        match &self.private_key {
            Some(path) => Ok(path.clone()),
            None => Ok(ghkeys::default_private_key_path()?),
        }
    }
}

/// Encrypt everything read from `input` and write the base64 armor
pub fn encrypt_stream(key: &RsaPublicKey, input: &mut impl Read, output: &mut impl Write) -> Result<()> {
    let mut plaintext = Vec::new();
    input.read_to_end(&mut plaintext).context("reading input")?;

    let armored = ghkeys::seal(key, &plaintext)?;
    output.write_all(armored.as_bytes()).context("writing output")?;
    output.flush()?;
    Ok(())
}

/// Decrypt the base64 armor read from `input` and write the raw plaintext
pub fn decrypt_stream(key: &RsaPrivateKey, input: &mut impl Read, output: &mut impl Write) -> Result<()> {
    let mut armored = Vec::new();
    input.read_to_end(&mut armored).context("reading input")?;

    let plaintext = ghkeys::open(key, &armored)?;
    output.write_all(&plaintext).context("writing output")?;
    output.flush()?;
    Ok(())
}

pub fn run(args: &Args, input: &mut impl Read, output: &mut impl Write) -> Result<()> {
    match args.mode()? {
        Mode::Encrypt {
            username,
            selection,
        } => {
            let fetcher = KeyFetcher::new(&args.github_api_endpoint)?;
            let record = fetcher.fetch_key(username, selection)?;
            let key = ghkeys::parse_public_key(&record.key)?;
            debug!(username, id = record.id, "encrypting");
            encrypt_stream(&key, input, output)
        }
        Mode::Decrypt => {
            let path = args.private_key_path()?;
            debug!(path = %path.display(), "decrypting");
            let key = ghkeys::read_private_key(&path)?;
            decrypt_stream(&key, input, output)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    const ALICE_PUB: &str = include_str!("../../ghkeys/tests/fixtures/alice_rsa.pub");
    const ALICE_PEM: &str = include_str!("../../ghkeys/tests/fixtures/alice_rsa.pem");
    const BOB_PEM: &str = include_str!("../../ghkeys/tests/fixtures/bob_rsa.pem");
    const ALICE_PKCS8: &str = include_str!("../../ghkeys/tests/fixtures/alice_pkcs8.pem");
    const HELLO_FOR_ALICE: &str = include_str!("../../ghkeys/tests/fixtures/hello_alice.b64");

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv.iter().copied()).unwrap()
    }

    fn key_file(pem: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(pem.as_bytes()).unwrap();
        file
    }

    /// Serve one keys listing and return the endpoint to reach it
    fn serve_keys(body: String) -> (String, JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buffer = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let read_count = stream.read(&mut buffer).unwrap();
                if read_count == 0 {
                    break;
                }
                request.extend_from_slice(&buffer[..read_count]);
            }
            assert!(request.starts_with(b"GET /users/octocat/keys "));
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
        });
        (endpoint, handle)
    }

    #[test]
    fn username_required_to_encrypt() {
        let err = Args::try_parse_from(["ghsshare"]).unwrap_err();
        assert_eq!(err.kind(), clap::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn decrypt_needs_no_username() {
        let args = parse(&["ghsshare", "--decrypt", "--private-key", "/tmp/key.pem"]);
        assert_eq!(args.mode().unwrap(), Mode::Decrypt);
        assert_eq!(args.private_key_path().unwrap(), PathBuf::from("/tmp/key.pem"));
    }

    #[test]
    fn encrypt_mode_defaults() {
        let args = parse(&["ghsshare", "octocat"]);
        assert_eq!(args.github_api_endpoint, ghkeys::DEFAULT_ENDPOINT);
        assert_eq!(
            args.mode().unwrap(),
            Mode::Encrypt {
                username: "octocat",
                selection: KeySelection::First
            }
        );
    }

    #[test]
    fn key_id_selects_key() {
        let args = parse(&["ghsshare", "--key-id", "42", "octocat"]);
        assert_eq!(args.key_selection(), KeySelection::Id(42));
    }

    #[test]
    fn key_id_conflicts_with_decrypt() {
        let err = Args::try_parse_from(["ghsshare", "--decrypt", "--key-id", "42"]).unwrap_err();
        assert_eq!(err.kind(), clap::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn stream_round_trip() {
        let public = ghkeys::parse_public_key(ALICE_PUB).unwrap();
        let private = ghkeys::parse_private_key_pem(ALICE_PEM.as_bytes()).unwrap();

        let mut armored = Vec::new();
        encrypt_stream(&public, &mut &b"hello"[..], &mut armored).unwrap();
        assert!(!armored.ends_with(b"\n"));

        let mut plaintext = Vec::new();
        decrypt_stream(&private, &mut armored.as_slice(), &mut plaintext).unwrap();
        assert_eq!(plaintext, b"hello");
    }

    #[test]
    fn bad_input_writes_nothing() {
        let private = ghkeys::parse_private_key_pem(ALICE_PEM.as_bytes()).unwrap();
        let mut output = Vec::new();

        let err = decrypt_stream(&private, &mut &b"%%% not base64 %%%"[..], &mut output).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ghkeys::Error>(),
            Some(ghkeys::Error::Base64(_))
        ));
        assert!(output.is_empty());
    }

    #[test]
    fn oversized_input_writes_nothing() {
        let public = ghkeys::parse_public_key(ALICE_PUB).unwrap();
        let mut output = Vec::new();

        let err = encrypt_stream(&public, &mut &[b'x'; 300][..], &mut output).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ghkeys::Error>(),
            Some(ghkeys::Error::MessageTooLong { len: 300, max: 214 })
        ));
        assert!(output.is_empty());
    }

    #[test]
    fn decrypts_with_key_file() {
        let file = key_file(ALICE_PEM);
        let path = file.path().to_str().unwrap();
        let args = parse(&["ghsshare", "--decrypt", "--private-key", path]);

        let mut output = Vec::new();
        run(&args, &mut HELLO_FOR_ALICE.as_bytes(), &mut output).unwrap();
        assert_eq!(output, b"hello");
    }

    #[test]
    fn wrong_key_file_fails() {
        let file = key_file(BOB_PEM);
        let path = file.path().to_str().unwrap();
        let args = parse(&["ghsshare", "--decrypt", "--private-key", path]);

        let mut output = Vec::new();
        let err = run(&args, &mut HELLO_FOR_ALICE.as_bytes(), &mut output).unwrap_err();
        assert_eq!(err.to_string(), "error decrypting");
        assert!(output.is_empty());
    }

    #[test]
    fn pkcs8_key_file_is_rejected() {
        let file = key_file(ALICE_PKCS8);
        let path = file.path().to_str().unwrap();
        let args = parse(&["ghsshare", "--decrypt", "--private-key", path]);

        let err = run(&args, &mut HELLO_FOR_ALICE.as_bytes(), &mut Vec::new()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ghkeys::Error>(),
            Some(ghkeys::Error::WrongKeyType { .. })
        ));
    }

    #[test]
    fn octocat_round_trip() {
        let body = format!(
            r#"[{{"id":1,"key":"{}"}},{{"id":2,"key":"ssh-ed25519 AAAA"}}]"#,
            ALICE_PUB.trim()
        );
        let (endpoint, server) = serve_keys(body);
        let args = parse(&["ghsshare", "--github-api-endpoint", &endpoint, "octocat"]);

        let mut armored = Vec::new();
        run(&args, &mut &b"hello"[..], &mut armored).unwrap();
        server.join().unwrap();

        let file = key_file(ALICE_PEM);
        let path = file.path().to_str().unwrap();
        let args = parse(&["ghsshare", "--decrypt", "--private-key", path]);

        let mut plaintext = Vec::new();
        run(&args, &mut armored.as_slice(), &mut plaintext).unwrap();
        assert_eq!(plaintext, b"hello");
    }

    #[test]
    fn non_rsa_key_is_rejected() {
        let body = r#"[{"id":5,"key":"ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIP164/a3dtL/+jnfbeo66kMFp7kTQ14/1+4SMaFj1yn2"}]"#;
        let (endpoint, server) = serve_keys(body.to_owned());
        let args = parse(&["ghsshare", "--github-api-endpoint", &endpoint, "octocat"]);

        let mut output = Vec::new();
        let err = run(&args, &mut &b"hello"[..], &mut output).unwrap_err();
        server.join().unwrap();
        assert_eq!(err.to_string(), "public key is ssh-ed25519, want ssh-rsa");
        assert!(output.is_empty());
    }
}
