//! Backend that delegates every primitive to the `openssl` command-line tool.
//!
//! Key material and payloads are handed over through temporary files that
//! are removed when the call returns, on success and failure alike. Small
//! inputs (passwords, data to sign) are streamed on stdin.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use once_cell::sync::OnceCell;
use tempfile::NamedTempFile;
use tracing::{debug, trace};
use zeroize::Zeroizing;

use super::Backend;
use crate::base64::{base64_decode, base64_encode};
use crate::config::OpenSslConfig;
use crate::error::CryptoError;
use crate::pem_codec::{decode_all, decode_first_of_type, encode, first_of_type};
use crate::token::truncate_password;
use crate::types::{
    OPENSSL_MARKER, PBKDF2_ITERATIONS, RSA_KEY_BITS, TYPE_CERTIFICATE, TYPE_PUBLIC_KEY,
};

#[derive(Debug, Clone)]
pub struct OpenSslBackend {
    binary: PathBuf,
    temp_dir: Option<PathBuf>,
}

impl OpenSslBackend {
    /// Locate a working `openssl` using `OPENSSL_BIN` or the search path.
    ///
    /// The outcome is computed once per process.
    pub fn probe() -> Result<Self, CryptoError> {
        static PROBED: OnceCell<Result<OpenSslBackend, String>> = OnceCell::new();
        PROBED
            .get_or_init(|| {
                Self::probe_with(&OpenSslConfig::from_env()).map_err(|e| match e {
                    CryptoError::BackendUnavailable(msg) => msg,
                    other => other.to_string(),
                })
            })
            .clone()
            .map_err(CryptoError::BackendUnavailable)
    }

    /// Probe a specific binary without touching the process-wide cache.
    pub fn probe_with(config: &OpenSslConfig) -> Result<Self, CryptoError> {
        let output = Command::new(&config.binary)
            .arg("version")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                CryptoError::BackendUnavailable(format!(
                    "cannot run {}: {}",
                    config.binary.display(),
                    e
                ))
            })?;
        let version = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() || !version.contains(OPENSSL_MARKER) {
            return Err(CryptoError::BackendUnavailable(format!(
                "{} is not an OpenSSL binary (version output {:?})",
                config.binary.display(),
                version.trim()
            )));
        }
        debug!(
            binary = %config.binary.display(),
            version = %version.trim(),
            "openssl probe succeeded"
        );
        Ok(Self {
            binary: config.binary.clone(),
            temp_dir: config.temp_dir.clone(),
        })
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args);
        cmd
    }

    /// Spawn `cmd`, feed `input` on stdin from a helper thread and collect
    /// the output. A non-zero exit status is returned as-is.
    fn spawn(
        &self,
        mut cmd: Command,
        input: &[u8],
    ) -> Result<(Output, io::Result<()>), CryptoError> {
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        let mut child = cmd.spawn().map_err(|e| {
            CryptoError::BackendUnavailable(format!(
                "cannot run {}: {}",
                self.binary.display(),
                e
            ))
        })?;
        let stdin = child.stdin.take();

        let (output, written) = std::thread::scope(|s| {
            let writer = s.spawn(move || match stdin {
                Some(mut pipe) => pipe.write_all(input),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("stdin writer panicked")));
            (output, written)
        });
        Ok((output?, written))
    }

    /// Run `cmd` and return stdout, failing on a non-zero exit status.
    fn run(&self, cmd: Command, input: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let name = describe(&cmd);
        let (output, written) = self.spawn(cmd, input)?;
        if !output.status.success() {
            return Err(CryptoError::ToolFailed {
                command: name,
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        written?;
        trace!(
            command = %name,
            stdout_len = output.stdout.len(),
            "openssl finished"
        );
        Ok(output.stdout)
    }

    fn sha256(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.run(self.command(&["dgst", "-sha256", "-binary"]), data)
    }

    fn enc_args(decrypt: bool) -> Vec<String> {
        let mut args = vec!["enc".to_string()];
        if decrypt {
            args.push("-d".to_string());
        }
        args.extend(
            ["-aes-256-cbc", "-pbkdf2", "-md", "sha256", "-iter"]
                .iter()
                .map(|s| s.to_string()),
        );
        args.push(PBKDF2_ITERATIONS.to_string());
        args
    }

    /// Write `contents` to a fresh private temporary file.
    fn temp_file(&self, contents: &[u8]) -> Result<NamedTempFile, CryptoError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("hpcr-");
        let mut file = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(contents)?;
        file.flush()?;
        Ok(file)
    }
}

fn describe(cmd: &Command) -> String {
    match cmd.get_args().next() {
        Some(sub) => format!("openssl {}", sub.to_string_lossy()),
        None => "openssl".to_string(),
    }
}

impl Backend for OpenSslBackend {
    fn name(&self) -> &'static str {
        "openssl"
    }

    fn private_key(&self) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        let bits = RSA_KEY_BITS.to_string();
        self.run(self.command(&["genrsa", bits.as_str()]), &[])
            .map(Zeroizing::new)
            .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))
    }

    fn public_key(&self, private_key: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let key_file = self.temp_file(private_key)?;
        let mut cmd = self.command(&["rsa", "-pubout", "-in"]);
        cmd.arg(key_file.path());
        self.run(cmd, &[])
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))
    }

    fn public_key_from_certificate(&self, certificate: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let cert_file = self.temp_file(certificate)?;
        let mut cmd = self.command(&["x509", "-pubkey", "-noout", "-in"]);
        cmd.arg(cert_file.path());
        self.run(cmd, &[])
    }

    fn cert_serial(&self, certificate: &[u8]) -> Result<String, CryptoError> {
        let cert_file = self.temp_file(certificate)?;
        let mut cmd = self.command(&["x509", "-serial", "-noout", "-in"]);
        cmd.arg(cert_file.path());
        let stdout = self.run(cmd, &[])?;
        let text = String::from_utf8_lossy(&stdout);
        let serial = text.trim().strip_prefix("serial=").ok_or_else(|| {
            CryptoError::InvalidKey(format!("unexpected serial output {:?}", text.trim()))
        })?;
        Ok(serial.to_string())
    }

    fn cert_fingerprint(&self, certificate: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let cert_file = self.temp_file(certificate)?;
        let mut cmd = self.command(&["x509", "-outform", "DER", "-in"]);
        cmd.arg(cert_file.path());
        let der = self.run(cmd, &[])?;
        self.sha256(&der)
    }

    fn private_key_fingerprint(&self, private_key: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let key_file = self.temp_file(private_key)?;
        let mut cmd = self.command(&["rsa", "-pubout", "-outform", "DER", "-in"]);
        cmd.arg(key_file.path());
        let der = self.run(cmd, &[])?;
        self.sha256(&der)
    }

    fn sign_digest(&self, private_key: &[u8], data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let key_file = self.temp_file(private_key)?;
        let mut cmd = self.command(&["dgst", "-sha256", "-sign"]);
        cmd.arg(key_file.path());
        self.run(cmd, data)
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))
    }

    fn verify_digest(
        &self,
        public_key: &[u8],
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), CryptoError> {
        decode_first_of_type(public_key, TYPE_PUBLIC_KEY)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let key_file = self.temp_file(public_key)?;
        let sig_file = self.temp_file(signature)?;
        let mut cmd = self.command(&["dgst", "-sha256", "-verify"]);
        cmd.arg(key_file.path()).arg("-signature").arg(sig_file.path());
        let (output, _) = self.spawn(cmd, data)?;
        if output.status.success() {
            Ok(())
        } else {
            Err(CryptoError::SignatureInvalid)
        }
    }

    fn random_password(&self, len: usize) -> Result<String, CryptoError> {
        let count = len.to_string();
        let bytes = Zeroizing::new(
            self.run(self.command(&["rand", count.as_str()]), &[])
                .map_err(|e| CryptoError::RngFailed(e.to_string()))?,
        );
        if bytes.len() != len {
            return Err(CryptoError::RngFailed(format!(
                "openssl rand returned {} bytes, expected {}",
                bytes.len(),
                len
            )));
        }
        Ok(truncate_password(base64_encode(&bytes), len))
    }

    fn asymmetric_encrypt(
        &self,
        key_or_certificate: &[u8],
        data: &[u8],
    ) -> Result<String, CryptoError> {
        let blocks = decode_all(key_or_certificate)?;
        let (label, flag, der) = if let Some(der) = first_of_type(&blocks, TYPE_CERTIFICATE) {
            (TYPE_CERTIFICATE, "-certin", der)
        } else if let Some(der) = first_of_type(&blocks, TYPE_PUBLIC_KEY) {
            (TYPE_PUBLIC_KEY, "-pubin", der)
        } else {
            return Err(CryptoError::UnsupportedKeyType(format!(
                "unable to decode neither a [{}] nor a [{}] block from PEM",
                TYPE_CERTIFICATE, TYPE_PUBLIC_KEY
            )));
        };
        let key_file = self.temp_file(encode(label, &der).as_bytes())?;
        let mut cmd = self.command(&["pkeyutl", "-encrypt", flag, "-inkey"]);
        cmd.arg(key_file.path());
        let ciphertext = self
            .run(cmd, data)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
        Ok(base64_encode(&ciphertext))
    }

    fn asymmetric_decrypt(
        &self,
        private_key: &[u8],
        ciphertext_b64: &str,
    ) -> Result<Vec<u8>, CryptoError> {
        let ciphertext = base64_decode(ciphertext_b64)
            .map_err(|e| CryptoError::InvalidCiphertext(format!("invalid base64: {}", e)))?;
        let key_file = self.temp_file(private_key)?;
        let mut cmd = self.command(&["pkeyutl", "-decrypt", "-inkey"]);
        cmd.arg(key_file.path());
        self.run(cmd, &ciphertext)
            .map_err(|e| CryptoError::InvalidCiphertext(e.to_string()))
    }

    fn symmetric_encrypt(&self, data: &[u8], password: &[u8]) -> Result<String, CryptoError> {
        let data_file = self.temp_file(data)?;
        let mut cmd = Command::new(&self.binary);
        cmd.args(Self::enc_args(false))
            .arg("-in")
            .arg(data_file.path())
            .args(["-pass", "stdin"]);
        let envelope = self
            .run(cmd, password)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
        Ok(base64_encode(&envelope))
    }

    fn symmetric_decrypt(
        &self,
        envelope_b64: &str,
        password: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let envelope = base64_decode(envelope_b64)
            .map_err(|e| CryptoError::DecryptionFailed(format!("invalid base64: {}", e)))?;
        let data_file = self.temp_file(&envelope)?;
        let mut cmd = Command::new(&self.binary);
        cmd.args(Self::enc_args(true))
            .arg("-in")
            .arg(data_file.path())
            .args(["-pass", "stdin"]);
        self.run(cmd, password)
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
    }
}
