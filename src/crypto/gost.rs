//! GOST R 34.10 elliptic-curve signatures (2001 and 2012 variants).
//!
//! The arithmetic is plain affine point math over openssl bignums; modular
//! inverses use Fermat exponentiation, which is valid because both the field
//! prime and the subgroup order are prime. Signatures travel as big-endian
//! `r‖s` with each half padded to the curve's key size.

use crate::algorithm::SignAlgorithm;
use crate::crypto::curves::{self, CurveParams};
use crate::crypto::errors::{CryptoResult, Error};
use openssl::bn::{BigNum, BigNumContext, BigNumRef};
use std::cmp::Ordering;
use std::fmt;

/// An affine point; `None` is the point at infinity.
type Point = Option<(BigNum, BigNum)>;

struct CurveArith {
    p: BigNum,
    a: BigNum,
    q: BigNum,
    gx: BigNum,
    gy: BigNum,
    b: BigNum,
}

fn bn(hex: &str) -> CryptoResult<BigNum> {
    Ok(BigNum::from_hex_str(hex)?)
}

fn clone_bn(v: &BigNumRef) -> CryptoResult<BigNum> {
    Ok(v.to_owned()?)
}

fn clone_point(p: &Point) -> CryptoResult<Point> {
    Ok(match p {
        None => None,
        Some((x, y)) => Some((clone_bn(x)?, clone_bn(y)?)),
    })
}

fn is_equal(a: &BigNumRef, b: &BigNumRef) -> bool {
    a.ucmp(b) == Ordering::Equal
}

fn is_zero(v: &BigNumRef) -> bool {
    v.num_bits() == 0
}

/// Left-pad a bignum to a fixed-width big-endian byte string.
fn pad_to(v: &BigNumRef, size: usize) -> Vec<u8> {
    let bytes = v.to_vec();
    let mut out = vec![0u8; size];
    out[size - bytes.len()..].copy_from_slice(&bytes);
    out
}

impl CurveArith {
    fn new(params: &CurveParams) -> CryptoResult<Self> {
        Ok(Self {
            p: bn(params.p)?,
            a: bn(params.a)?,
            b: bn(params.b)?,
            q: bn(params.q)?,
            gx: bn(params.x)?,
            gy: bn(params.y)?,
        })
    }

    fn generator(&self) -> CryptoResult<Point> {
        Ok(Some((clone_bn(&self.gx)?, clone_bn(&self.gy)?)))
    }

    /// Inverse mod the field prime via a^(p-2).
    fn inv_mod_p(&self, v: &BigNumRef, ctx: &mut BigNumContext) -> CryptoResult<BigNum> {
        let two = BigNum::from_u32(2)?;
        let mut exp = BigNum::new()?;
        exp.checked_sub(&self.p, &two)?;
        let mut out = BigNum::new()?;
        out.mod_exp(v, &exp, &self.p, ctx)?;
        Ok(out)
    }

    fn mod_p(&self, v: &BigNumRef, ctx: &mut BigNumContext) -> CryptoResult<BigNum> {
        let mut out = BigNum::new()?;
        out.nnmod(v, &self.p, ctx)?;
        Ok(out)
    }

    /// Affine point addition, handling doubling and inverse points.
    fn add(&self, lhs: &Point, rhs: &Point, ctx: &mut BigNumContext) -> CryptoResult<Point> {
        let (x1, y1) = match lhs {
            None => return clone_point(rhs),
            Some(p) => p,
        };
        let (x2, y2) = match rhs {
            None => return clone_point(lhs),
            Some(p) => p,
        };

        let lambda = if is_equal(x1, x2) {
            let mut y_sum = BigNum::new()?;
            y_sum.checked_add(y1, y2)?;
            let y_sum = self.mod_p(&y_sum, ctx)?;
            if is_zero(&y_sum) {
                // P + (-P)
                return Ok(None);
            }
            // Tangent slope: (3*x1^2 + a) / (2*y1)
            let two = BigNum::from_u32(2)?;
            let three = BigNum::from_u32(3)?;
            let mut x_sq = BigNum::new()?;
            x_sq.mod_mul(x1, x1, &self.p, ctx)?;
            let mut num = BigNum::new()?;
            num.mod_mul(&x_sq, &three, &self.p, ctx)?;
            let mut num_a = BigNum::new()?;
            num_a.checked_add(&num, &self.a)?;
            let num = self.mod_p(&num_a, ctx)?;

            let mut den = BigNum::new()?;
            den.mod_mul(y1, &two, &self.p, ctx)?;
            let den_inv = self.inv_mod_p(&den, ctx)?;
            let mut lambda = BigNum::new()?;
            lambda.mod_mul(&num, &den_inv, &self.p, ctx)?;
            lambda
        } else {
            // Chord slope: (y2 - y1) / (x2 - x1)
            let mut num = BigNum::new()?;
            num.checked_sub(y2, y1)?;
            let num = self.mod_p(&num, ctx)?;
            let mut den = BigNum::new()?;
            den.checked_sub(x2, x1)?;
            let den = self.mod_p(&den, ctx)?;
            let den_inv = self.inv_mod_p(&den, ctx)?;
            let mut lambda = BigNum::new()?;
            lambda.mod_mul(&num, &den_inv, &self.p, ctx)?;
            lambda
        };

        // x3 = lambda^2 - x1 - x2
        let mut lambda_sq = BigNum::new()?;
        lambda_sq.mod_mul(&lambda, &lambda, &self.p, ctx)?;
        let mut t = BigNum::new()?;
        t.checked_sub(&lambda_sq, x1)?;
        let mut x3 = BigNum::new()?;
        x3.checked_sub(&t, x2)?;
        let x3 = self.mod_p(&x3, ctx)?;

        // y3 = lambda*(x1 - x3) - y1
        let mut dx = BigNum::new()?;
        dx.checked_sub(x1, &x3)?;
        let dx = self.mod_p(&dx, ctx)?;
        let mut ldx = BigNum::new()?;
        ldx.mod_mul(&lambda, &dx, &self.p, ctx)?;
        let mut y3 = BigNum::new()?;
        y3.checked_sub(&ldx, y1)?;
        let y3 = self.mod_p(&y3, ctx)?;

        Ok(Some((x3, y3)))
    }

    /// Double-and-add scalar multiplication.
    fn mul(&self, k: &BigNumRef, base: &Point, ctx: &mut BigNumContext) -> CryptoResult<Point> {
        let mut acc: Point = None;
        let mut addend = clone_point(base)?;
        for bit in 0..k.num_bits() {
            if k.is_bit_set(bit) {
                acc = self.add(&acc, &addend, ctx)?;
            }
            addend = self.add(&addend, &addend, ctx)?;
        }
        Ok(acc)
    }

    /// Check y^2 = x^3 + a*x + b over the field.
    fn on_curve(&self, x: &BigNumRef, y: &BigNumRef, ctx: &mut BigNumContext) -> CryptoResult<bool> {
        let mut lhs = BigNum::new()?;
        lhs.mod_mul(y, y, &self.p, ctx)?;

        let mut x_sq = BigNum::new()?;
        x_sq.mod_mul(x, x, &self.p, ctx)?;
        let mut x_cu = BigNum::new()?;
        x_cu.mod_mul(&x_sq, x, &self.p, ctx)?;
        let mut ax = BigNum::new()?;
        ax.mod_mul(&self.a, x, &self.p, ctx)?;
        let mut sum = BigNum::new()?;
        sum.checked_add(&x_cu, &ax)?;
        let mut sum_b = BigNum::new()?;
        sum_b.checked_add(&sum, &self.b)?;
        let rhs = self.mod_p(&sum_b, ctx)?;

        Ok(is_equal(&lhs, &rhs))
    }

    /// Digest bytes reduced mod q; zero maps to one per the standard.
    fn digest_scalar(&self, digest: &[u8], ctx: &mut BigNumContext) -> CryptoResult<BigNum> {
        let raw = BigNum::from_slice(digest)?;
        let mut e = BigNum::new()?;
        e.nnmod(&raw, &self.q, ctx)?;
        if is_zero(&e) {
            return Ok(BigNum::from_u32(1)?);
        }
        Ok(e)
    }

    /// Random scalar in [1, q).
    fn random_scalar(&self) -> CryptoResult<BigNum> {
        loop {
            let mut k = BigNum::new()?;
            self.q.rand_range(&mut k)?;
            if !is_zero(&k) {
                return Ok(k);
            }
        }
    }
}

/// Public key: an affine point on a named curve.
#[derive(Debug, Clone)]
pub struct GostPublicKey {
    algorithm: SignAlgorithm,
    curve: &'static CurveParams,
    x: Vec<u8>,
    y: Vec<u8>,
}

impl GostPublicKey {
    /// Build from fixed-width coordinates, checking the point is on the curve.
    pub fn from_coordinates(
        algorithm: SignAlgorithm,
        curve_name: &str,
        x: &[u8],
        y: &[u8],
    ) -> CryptoResult<Self> {
        let curve = curves::find(curve_name)
            .ok_or_else(|| Error::UnsupportedCurve(curve_name.to_string()))?;
        if x.len() != curve.key_size || y.len() != curve.key_size {
            return Err(Error::Invalid(format!(
                "Coordinate size mismatch: expected {} bytes",
                curve.key_size
            )));
        }
        let arith = CurveArith::new(curve)?;
        let mut ctx = BigNumContext::new()?;
        let bx = BigNum::from_slice(x)?;
        let by = BigNum::from_slice(y)?;
        if !arith.on_curve(&bx, &by, &mut ctx)? {
            return Err(Error::Invalid("Point is not on the curve".into()));
        }
        Ok(Self {
            algorithm,
            curve,
            x: x.to_vec(),
            y: y.to_vec(),
        })
    }

    /// Build from an uncompressed SEC1 point (`0x04 ‖ X ‖ Y`).
    pub fn from_encoded_point(
        algorithm: SignAlgorithm,
        curve_name: &str,
        point: &[u8],
    ) -> CryptoResult<Self> {
        let curve = curves::find(curve_name)
            .ok_or_else(|| Error::UnsupportedCurve(curve_name.to_string()))?;
        let expected = 1 + 2 * curve.key_size;
        if point.len() != expected || point[0] != 0x04 {
            return Err(Error::Invalid(format!(
                "Expected an uncompressed point of {expected} bytes"
            )));
        }
        let (x, y) = point[1..].split_at(curve.key_size);
        Self::from_coordinates(algorithm, curve_name, x, y)
    }

    /// Uncompressed SEC1 encoding.
    pub fn encoded_point(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + 2 * self.curve.key_size);
        out.push(0x04);
        out.extend_from_slice(&self.x);
        out.extend_from_slice(&self.y);
        out
    }

    /// Key bytes as they travel in an X.509 SPKI per RFC 4491:
    /// little-endian X followed by little-endian Y, no point tag.
    pub fn spki_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 * self.curve.key_size);
        out.extend(self.x.iter().rev());
        out.extend(self.y.iter().rev());
        out
    }

    /// Decode the RFC 4491 SPKI key bytes.
    pub fn from_spki_bytes(
        algorithm: SignAlgorithm,
        curve_name: &str,
        raw: &[u8],
    ) -> CryptoResult<Self> {
        let curve = curves::find(curve_name)
            .ok_or_else(|| Error::UnsupportedCurve(curve_name.to_string()))?;
        if raw.len() != 2 * curve.key_size {
            return Err(Error::Invalid(format!(
                "Expected {} key bytes, got {}",
                2 * curve.key_size,
                raw.len()
            )));
        }
        let (x_le, y_le) = raw.split_at(curve.key_size);
        let x: Vec<u8> = x_le.iter().rev().copied().collect();
        let y: Vec<u8> = y_le.iter().rev().copied().collect();
        Self::from_coordinates(algorithm, curve_name, &x, &y)
    }

    pub fn algorithm(&self) -> SignAlgorithm {
        self.algorithm
    }

    pub fn curve(&self) -> &'static CurveParams {
        self.curve
    }
}

/// A private scalar with its public point.
pub struct GostKeyPair {
    algorithm: SignAlgorithm,
    curve: &'static CurveParams,
    d: BigNum,
    public: GostPublicKey,
}

impl GostKeyPair {
    /// Generate a fresh key pair on the named curve.
    pub fn generate(algorithm: SignAlgorithm, curve_name: &str) -> CryptoResult<Self> {
        let curve = curves::find(curve_name)
            .ok_or_else(|| Error::UnsupportedCurve(curve_name.to_string()))?;
        let arith = CurveArith::new(curve)?;
        let mut ctx = BigNumContext::new()?;

        let d = arith.random_scalar()?;
        let public_point = arith.mul(&d, &arith.generator()?, &mut ctx)?;
        let (px, py) = public_point
            .ok_or_else(|| Error::Invalid("Key generation produced the identity point".into()))?;

        let public = GostPublicKey {
            algorithm,
            curve,
            x: pad_to(&px, curve.key_size),
            y: pad_to(&py, curve.key_size),
        };
        Ok(Self {
            algorithm,
            curve,
            d,
            public,
        })
    }

    pub fn algorithm(&self) -> SignAlgorithm {
        self.algorithm
    }

    pub fn curve(&self) -> &'static CurveParams {
        self.curve
    }

    pub fn public_key(&self) -> &GostPublicKey {
        &self.public
    }
}

impl fmt::Debug for GostKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GostKeyPair")
            .field("algorithm", &self.algorithm)
            .field("curve", &self.curve.name)
            .field("d", &"[REDACTED]")
            .finish()
    }
}

/// Sign a message digest, returning big-endian `r‖s`.
pub fn sign(key: &GostKeyPair, digest: &[u8]) -> CryptoResult<Vec<u8>> {
    let arith = CurveArith::new(key.curve)?;
    let mut ctx = BigNumContext::new()?;
    let e = arith.digest_scalar(digest, &mut ctx)?;
    let generator = arith.generator()?;

    loop {
        let k = arith.random_scalar()?;
        let c = arith.mul(&k, &generator, &mut ctx)?;
        let (cx, _) = match c {
            Some(p) => p,
            None => continue,
        };
        let mut r = BigNum::new()?;
        r.nnmod(&cx, &arith.q, &mut ctx)?;
        if is_zero(&r) {
            continue;
        }

        // s = (r*d + k*e) mod q
        let mut rd = BigNum::new()?;
        rd.mod_mul(&r, &key.d, &arith.q, &mut ctx)?;
        let mut ke = BigNum::new()?;
        ke.mod_mul(&k, &e, &arith.q, &mut ctx)?;
        let mut sum = BigNum::new()?;
        sum.checked_add(&rd, &ke)?;
        let mut s = BigNum::new()?;
        s.nnmod(&sum, &arith.q, &mut ctx)?;
        if is_zero(&s) {
            continue;
        }

        let mut out = pad_to(&r, key.curve.key_size);
        out.extend_from_slice(&pad_to(&s, key.curve.key_size));
        return Ok(out);
    }
}

/// Verify an `r‖s` signature over a message digest.
pub fn verify(public: &GostPublicKey, digest: &[u8], signature: &[u8]) -> CryptoResult<bool> {
    let curve = public.curve;
    if signature.len() != curve.signature_size() {
        return Err(Error::Invalid(format!(
            "Signature must be {} bytes, got {}",
            curve.signature_size(),
            signature.len()
        )));
    }

    let arith = CurveArith::new(curve)?;
    let mut ctx = BigNumContext::new()?;

    let (r_bytes, s_bytes) = signature.split_at(curve.key_size);
    let r = BigNum::from_slice(r_bytes)?;
    let s = BigNum::from_slice(s_bytes)?;
    if is_zero(&r) || is_zero(&s) {
        return Ok(false);
    }
    if r.ucmp(&arith.q) != Ordering::Less || s.ucmp(&arith.q) != Ordering::Less {
        return Ok(false);
    }

    let e = arith.digest_scalar(digest, &mut ctx)?;

    // v = e^(-1) mod q
    let two = BigNum::from_u32(2)?;
    let mut exp = BigNum::new()?;
    exp.checked_sub(&arith.q, &two)?;
    let mut v = BigNum::new()?;
    v.mod_exp(&e, &exp, &arith.q, &mut ctx)?;

    // z1 = s*v, z2 = -r*v mod q
    let mut z1 = BigNum::new()?;
    z1.mod_mul(&s, &v, &arith.q, &mut ctx)?;
    let mut rv = BigNum::new()?;
    rv.mod_mul(&r, &v, &arith.q, &mut ctx)?;
    let mut neg = BigNum::new()?;
    neg.checked_sub(&arith.q, &rv)?;
    let mut z2 = BigNum::new()?;
    z2.nnmod(&neg, &arith.q, &mut ctx)?;

    let qx = BigNum::from_slice(&public.x)?;
    let qy = BigNum::from_slice(&public.y)?;
    let term1 = arith.mul(&z1, &arith.generator()?, &mut ctx)?;
    let term2 = arith.mul(&z2, &Some((qx, qy)), &mut ctx)?;
    let c = arith.add(&term1, &term2, &mut ctx)?;

    let (cx, _) = match c {
        Some(p) => p,
        None => return Ok(false),
    };
    let mut big_r = BigNum::new()?;
    big_r.nnmod(&cx, &arith.q, &mut ctx)?;
    Ok(is_equal(&big_r, &r))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::curves;

    fn fake_digest(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 + 7) as u8).collect()
    }

    #[test]
    fn test_zero_scalar_detection() {
        assert!(is_zero(&BigNum::new().unwrap()));
        assert!(!is_zero(&BigNum::from_u32(1).unwrap()));
        assert!(!is_zero(&BigNum::from_u32(256).unwrap()));
    }

    #[test]
    fn test_generator_is_on_every_curve() {
        for curve in curves::all() {
            let arith = CurveArith::new(curve).unwrap();
            let mut ctx = BigNumContext::new().unwrap();
            assert!(
                arith.on_curve(&arith.gx, &arith.gy, &mut ctx).unwrap(),
                "generator off-curve for {}",
                curve.name
            );
        }
    }

    #[test]
    fn test_generator_order() {
        for curve in curves::all() {
            let arith = CurveArith::new(curve).unwrap();
            let mut ctx = BigNumContext::new().unwrap();
            let product = arith
                .mul(&arith.q.to_owned().unwrap(), &arith.generator().unwrap(), &mut ctx)
                .unwrap();
            assert!(product.is_none(), "qG != O for {}", curve.name);
        }
    }

    #[test]
    fn test_sign_verify_round_trip() {
        for (alg, name) in [
            (SignAlgorithm::Gost2001, "GostR3410-2001-CryptoPro-A"),
            (SignAlgorithm::Gost2012_256, "Tc26-Gost-3410-12-256-paramSetA"),
            (SignAlgorithm::Gost2012_512, "Tc26-Gost-3410-12-512-paramSetA"),
            (SignAlgorithm::Gost2012_512, "Tc26-Gost-3410-12-512-paramSetC"),
        ] {
            let key = GostKeyPair::generate(alg, name).unwrap();
            let digest = fake_digest(key.curve().key_size);
            let signature = sign(&key, &digest).unwrap();
            assert_eq!(signature.len(), key.curve().signature_size());
            assert!(verify(key.public_key(), &digest, &signature).unwrap());

            let mut wrong_digest = digest.clone();
            wrong_digest[0] ^= 0xFF;
            assert!(!verify(key.public_key(), &wrong_digest, &signature).unwrap());

            let mut tampered = signature.clone();
            tampered[1] ^= 0x01;
            assert!(!verify(key.public_key(), &digest, &tampered).unwrap());
        }
    }

    #[test]
    fn test_all_2001_parameter_sets() {
        for name in [
            "GostR3410-2001-CryptoPro-B",
            "GostR3410-2001-CryptoPro-C",
            "GostR3410-2001-CryptoPro-XchA",
            "GostR3410-2001-CryptoPro-XchB",
        ] {
            let key = GostKeyPair::generate(SignAlgorithm::Gost2001, name).unwrap();
            let digest = fake_digest(32);
            let signature = sign(&key, &digest).unwrap();
            assert!(verify(key.public_key(), &digest, &signature).unwrap());
        }
    }

    #[test]
    fn test_signature_length_is_checked() {
        let key =
            GostKeyPair::generate(SignAlgorithm::Gost2001, "GostR3410-2001-CryptoPro-A").unwrap();
        let digest = fake_digest(32);
        let result = verify(key.public_key(), &digest, &[0u8; 63]);
        assert!(matches!(result, Err(Error::Invalid(_))));
    }

    #[test]
    fn test_cross_key_verification_fails() {
        let name = "GostR3410-2001-CryptoPro-A";
        let key1 = GostKeyPair::generate(SignAlgorithm::Gost2001, name).unwrap();
        let key2 = GostKeyPair::generate(SignAlgorithm::Gost2001, name).unwrap();
        let digest = fake_digest(32);
        let signature = sign(&key1, &digest).unwrap();
        assert!(!verify(key2.public_key(), &digest, &signature).unwrap());
    }

    #[test]
    fn test_point_round_trip() {
        let key =
            GostKeyPair::generate(SignAlgorithm::Gost2012_256, "Tc26-Gost-3410-12-256-paramSetA")
                .unwrap();
        let encoded = key.public_key().encoded_point();
        assert_eq!(encoded.len(), 65);
        assert_eq!(encoded[0], 0x04);
        let decoded = GostPublicKey::from_encoded_point(
            SignAlgorithm::Gost2012_256,
            "Tc26-Gost-3410-12-256-paramSetA",
            &encoded,
        )
        .unwrap();
        assert_eq!(decoded.encoded_point(), encoded);
    }

    #[test]
    fn test_spki_bytes_are_little_endian_coordinates() {
        let name = "Tc26-Gost-3410-12-256-paramSetA";
        let key = GostKeyPair::generate(SignAlgorithm::Gost2012_256, name).unwrap();
        let point = key.public_key().encoded_point();
        let spki = key.public_key().spki_bytes();
        assert_eq!(spki.len(), 64);

        let (x_be, _) = point[1..].split_at(32);
        let x_reversed: Vec<u8> = x_be.iter().rev().copied().collect();
        assert_eq!(&spki[..32], x_reversed.as_slice());

        let decoded =
            GostPublicKey::from_spki_bytes(SignAlgorithm::Gost2012_256, name, &spki).unwrap();
        assert_eq!(decoded.encoded_point(), point);
    }

    #[test]
    fn test_spki_bytes_length_is_checked() {
        let result = GostPublicKey::from_spki_bytes(
            SignAlgorithm::Gost2001,
            "GostR3410-2001-CryptoPro-A",
            &[0u8; 63],
        );
        assert!(matches!(result, Err(Error::Invalid(_))));
    }

    #[test]
    fn test_off_curve_point_rejected() {
        let bogus = vec![0x42u8; 32];
        let result = GostPublicKey::from_coordinates(
            SignAlgorithm::Gost2001,
            "GostR3410-2001-CryptoPro-A",
            &bogus,
            &bogus,
        );
        assert!(matches!(result, Err(Error::Invalid(_))));
    }

    #[test]
    fn test_unknown_curve_rejected() {
        let result = GostKeyPair::generate(SignAlgorithm::Gost2001, "NistP256");
        assert!(matches!(result, Err(Error::UnsupportedCurve(_))));
    }
}
