use openssl::hash::MessageDigest;
use openssl::pkcs5::pbkdf2_hmac;
use openssl::symm::Cipher;
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroizing;

use crate::store::StoreError;

/// Magic bytes identifying a sealed credential container.
const CONTAINER_MAGIC: &[u8; 8] = b"CREDVLT\x00";
/// Container format version.
const FORMAT_VERSION: u16 = 1;
/// Size of the format version field (u16 = 2 bytes)
const VERSION_SIZE: usize = 2;
/// Size of the PBKDF2 salt (128 bits = 16 bytes)
pub const PBKDF2_SALT_SIZE: usize = 16;
/// Size of the derived AES-256 key (256 bits = 32 bytes)
pub const AES_GCM_256_KEY_SIZE: usize = 32;
/// Size of the AES-GCM nonce (96 bits = 12 bytes)
pub const AES_GCM_NONCE_SIZE: usize = 12;
/// Size of the AES-GCM authentication tag (128 bits = 16 bytes)
pub const AES_GCM_TAG_SIZE: usize = 16;
/// Size of data length field in serialized format (u32 = 4 bytes)
const DATA_LEN_SIZE: usize = 4;
/// PBKDF2-HMAC-SHA256 iteration count for deriving the container key.
pub const PBKDF2_ITERATIONS: usize = 600_000;

/// A password-sealed byte container: salt, nonce, tag, and ciphertext.
///
/// Wrong password and tampered ciphertext are indistinguishable on open; both
/// surface as [`StoreError::BadPassword`].
#[derive(Debug)]
pub(crate) struct SealedContainer {
    salt: Vec<u8>,
    nonce: Vec<u8>,
    tag: Vec<u8>,
    ciphertext: Vec<u8>,
}

impl SealedContainer {
    pub(crate) fn seal(password: &SecretString, plaintext: &[u8]) -> Result<Self, StoreError> {
        let mut salt = [0u8; PBKDF2_SALT_SIZE];
        openssl::rand::rand_bytes(&mut salt)?;

        let mut nonce = [0u8; AES_GCM_NONCE_SIZE];
        openssl::rand::rand_bytes(&mut nonce)?;

        let key = derive_key(password, &salt)?;
        let cipher = Cipher::aes_256_gcm();
        let mut tag = [0u8; AES_GCM_TAG_SIZE];

        let ciphertext =
            openssl::symm::encrypt_aead(cipher, key.as_ref(), Some(&nonce), &[], plaintext, &mut tag)?;

        Ok(SealedContainer {
            salt: salt.to_vec(),
            nonce: nonce.to_vec(),
            tag: tag.to_vec(),
            ciphertext,
        })
    }

    pub(crate) fn open(&self, password: &SecretString) -> Result<Zeroizing<Vec<u8>>, StoreError> {
        let key = derive_key(password, &self.salt)?;
        let cipher = Cipher::aes_256_gcm();

        openssl::symm::decrypt_aead(
            cipher,
            key.as_ref(),
            Some(&self.nonce),
            &[],
            &self.ciphertext,
            &self.tag,
        )
        .map(Zeroizing::new)
        .map_err(|_| StoreError::BadPassword)
    }

    pub(crate) fn serialize(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(
            CONTAINER_MAGIC.len()
                + VERSION_SIZE
                + PBKDF2_SALT_SIZE
                + AES_GCM_NONCE_SIZE
                + AES_GCM_TAG_SIZE
                + DATA_LEN_SIZE
                + self.ciphertext.len(),
        );
        data.extend_from_slice(CONTAINER_MAGIC);
        data.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        data.extend_from_slice(&self.salt);
        data.extend_from_slice(&self.nonce);
        data.extend_from_slice(&self.tag);
        let data_len = self.ciphertext.len() as u32;
        data.extend_from_slice(&data_len.to_le_bytes());
        data.extend_from_slice(&self.ciphertext);
        data
    }

    pub(crate) fn deserialize(data: &[u8]) -> Result<Self, StoreError> {
        let mut offset = 0;

        if data.len() < CONTAINER_MAGIC.len() + VERSION_SIZE {
            return Err(StoreError::Corrupt(
                "container too short to hold header".to_string(),
            ));
        }

        if &data[..CONTAINER_MAGIC.len()] != CONTAINER_MAGIC {
            return Err(StoreError::Corrupt(
                "container magic mismatch".to_string(),
            ));
        }
        offset += CONTAINER_MAGIC.len();

        let version = u16::from_le_bytes(data[offset..offset + VERSION_SIZE].try_into().unwrap());
        if version != FORMAT_VERSION {
            return Err(StoreError::Corrupt(format!(
                "unsupported container version {}",
                version
            )));
        }
        offset += VERSION_SIZE;

        if data.len() < offset + PBKDF2_SALT_SIZE + AES_GCM_NONCE_SIZE + AES_GCM_TAG_SIZE {
            return Err(StoreError::Corrupt(
                "container too short to hold salt, nonce, and tag".to_string(),
            ));
        }

        let salt = data[offset..offset + PBKDF2_SALT_SIZE].to_vec();
        offset += PBKDF2_SALT_SIZE;

        let nonce = data[offset..offset + AES_GCM_NONCE_SIZE].to_vec();
        offset += AES_GCM_NONCE_SIZE;

        let tag = data[offset..offset + AES_GCM_TAG_SIZE].to_vec();
        offset += AES_GCM_TAG_SIZE;

        if data.len() < offset + DATA_LEN_SIZE {
            return Err(StoreError::Corrupt(
                "container too short to hold data length".to_string(),
            ));
        }

        let data_len = u32::from_le_bytes(
            data[offset..offset + DATA_LEN_SIZE].try_into().unwrap(),
        ) as usize;
        offset += DATA_LEN_SIZE;

        if data.len() != offset + data_len {
            return Err(StoreError::Corrupt(
                "container length does not match encoded data length".to_string(),
            ));
        }

        let ciphertext = data[offset..offset + data_len].to_vec();

        Ok(SealedContainer {
            salt,
            nonce,
            tag,
            ciphertext,
        })
    }
}

fn derive_key(
    password: &SecretString,
    salt: &[u8],
) -> Result<Zeroizing<[u8; AES_GCM_256_KEY_SIZE]>, StoreError> {
    let mut key = Zeroizing::new([0u8; AES_GCM_256_KEY_SIZE]);
    pbkdf2_hmac(
        password.expose_secret().as_bytes(),
        salt,
        PBKDF2_ITERATIONS,
        MessageDigest::sha256(),
        key.as_mut(),
    )?;
    Ok(key)
}
