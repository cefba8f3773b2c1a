//! AWS KMS envelope-encryption keyring.
//!
//! Calls KMS `Encrypt`/`Decrypt` directly against a customer master key ARN
//! rather than using the AWS Encryption SDK's keyring abstraction — the
//! control plane only ever encrypts small fields (OAuth2 tokens, API-key
//! material), well under KMS's 4KB direct-encryption limit, so the extra
//! envelope/data-key machinery the Python implementation uses is unneeded.

use super::CryptoError;
use async_trait::async_trait;

// Mock AWS SDK types for compilation when the feature is disabled, following
// the same pattern as `shared::secrets::aws`'s mock_aws module.
#[cfg(not(feature = "aws-kms"))]
mod mock_kms {
    #[allow(dead_code)]
    pub struct Client;
    #[allow(dead_code)]
    pub struct Error;

    impl Client {
        #[allow(dead_code)]
        pub fn encrypt(&self) -> EncryptBuilder {
            EncryptBuilder
        }
        #[allow(dead_code)]
        pub fn decrypt(&self) -> DecryptBuilder {
            DecryptBuilder
        }
    }

    #[allow(dead_code)]
    pub struct EncryptBuilder;
    impl EncryptBuilder {
        #[allow(dead_code)]
        pub fn key_id(self, _: &str) -> Self {
            self
        }
        #[allow(dead_code)]
        pub fn plaintext(self, _: Vec<u8>) -> Self {
            self
        }
        #[allow(dead_code)]
        pub async fn send(self) -> Result<EncryptOutput, Error> {
            Err(Error)
        }
    }

    #[allow(dead_code)]
    pub struct EncryptOutput {
        pub ciphertext_blob: Option<Vec<u8>>,
    }

    #[allow(dead_code)]
    pub struct DecryptBuilder;
    impl DecryptBuilder {
        #[allow(dead_code)]
        pub fn ciphertext_blob(self, _: Vec<u8>) -> Self {
            self
        }
        #[allow(dead_code)]
        pub async fn send(self) -> Result<DecryptOutput, Error> {
            Err(Error)
        }
    }

    #[allow(dead_code)]
    pub struct DecryptOutput {
        pub plaintext: Option<Vec<u8>>,
    }
}

#[cfg(not(feature = "aws-kms"))]
use mock_kms::Client;

#[cfg(feature = "aws-kms")]
use aws_sdk_kms::{primitives::Blob, Client};

pub struct AwsKmsKeyring {
    client: Client,
    key_arn: String,
}

impl AwsKmsKeyring {
    pub async fn new(
        key_arn: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> Result<Self, CryptoError> {
        #[cfg(feature = "aws-kms")]
        {
            let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
                .region(aws_sdk_kms::config::Region::new(region));
            if let Some(endpoint) = endpoint_url {
                loader = loader.endpoint_url(endpoint);
            }
            let sdk_config = loader.load().await;
            let client = Client::new(&sdk_config);
            Ok(Self { client, key_arn })
        }
        #[cfg(not(feature = "aws-kms"))]
        {
            let _ = (region, endpoint_url);
            Ok(Self {
                client: Client,
                key_arn,
            })
        }
    }
}

#[async_trait]
impl super::Keyring for AwsKmsKeyring {
    async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        #[cfg(feature = "aws-kms")]
        {
            let output = self
                .client
                .encrypt()
                .key_id(&self.key_arn)
                .plaintext(Blob::new(plaintext.to_vec()))
                .send()
                .await
                .map_err(|e| CryptoError::Kms(e.to_string()))?;
            output
                .ciphertext_blob
                .map(|b| b.into_inner())
                .ok_or_else(|| CryptoError::Kms("KMS Encrypt returned no ciphertext".to_string()))
        }
        #[cfg(not(feature = "aws-kms"))]
        {
            let _ = plaintext;
            Err(CryptoError::Kms(
                "aws-kms feature not enabled".to_string(),
            ))
        }
    }

    async fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        #[cfg(feature = "aws-kms")]
        {
            let output = self
                .client
                .decrypt()
                .ciphertext_blob(Blob::new(ciphertext.to_vec()))
                .send()
                .await
                .map_err(|e| CryptoError::Kms(e.to_string()))?;
            output
                .plaintext
                .map(|b| b.into_inner())
                .ok_or_else(|| CryptoError::Kms("KMS Decrypt returned no plaintext".to_string()))
        }
        #[cfg(not(feature = "aws-kms"))]
        {
            let _ = ciphertext;
            Err(CryptoError::Kms(
                "aws-kms feature not enabled".to_string(),
            ))
        }
    }
}
