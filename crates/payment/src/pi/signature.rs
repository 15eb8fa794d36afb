use hmac::{Hmac, Mac, digest::InvalidLength};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const SEPARATOR: char = '|';

/// Signs and checks webhook deliveries: HMAC-SHA256 over `paymentId|txid`,
/// hex encoded.
#[derive(Clone)]
pub struct WebhookVerifier {
    keyed: HmacSha256,
}

impl WebhookVerifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, InvalidLength> {
        Ok(Self {
            keyed: HmacSha256::new_from_slice(secret.as_ref())?,
        })
    }

    fn mac(&self, payment_id: &str, txid: &str) -> HmacSha256 {
        let mut mac = self.keyed.clone();
        mac.update(payment_id.as_bytes());
        mac.update(&[SEPARATOR as u8]);
        mac.update(txid.as_bytes());
        mac
    }

    pub fn sign(&self, payment_id: &str, txid: &str) -> String {
        hex::encode(self.mac(payment_id, txid).finalize().into_bytes())
    }

    /// Constant-time comparison against a hex signature. Anything that does
    /// not decode is rejected, as is a field containing the separator, since
    /// `a|` + `b` and `a` + `|b` would share a MAC.
    pub fn verify(&self, payment_id: &str, txid: &str, signature: &str) -> bool {
        if payment_id.contains(SEPARATOR) || txid.contains(SEPARATOR) {
            return false;
        }

        let Ok(expected) = hex::decode(signature.trim()) else {
            return false;
        };

        self.mac(payment_id, txid).verify_slice(&expected).is_ok()
    }
}
