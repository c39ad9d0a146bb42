//! Named GOST R 34.10 curve parameter sets.
//!
//! Field and group constants are kept as big-endian hex strings and parsed
//! into bignums on demand. `q` is the prime order of the generator subgroup;
//! for cofactor-4 curves it is the subgroup order, not the full curve order.

/// One named elliptic-curve parameter set over a prime field.
#[derive(Debug)]
pub struct CurveParams {
    /// RFC 4357 / TC26 parameter-set name
    pub name: &'static str,
    /// Parameter-set OID, carried in SPKI algorithm parameters
    pub oid: &'static str,
    /// Field prime
    pub p: &'static str,
    /// Curve coefficient a
    pub a: &'static str,
    /// Curve coefficient b
    pub b: &'static str,
    /// Generator subgroup order (prime)
    pub q: &'static str,
    /// Subgroup cofactor
    pub cofactor: u32,
    /// Generator x coordinate
    pub x: &'static str,
    /// Generator y coordinate
    pub y: &'static str,
    /// Scalar/coordinate size in bytes
    pub key_size: usize,
}

impl CurveParams {
    /// Wire size of an r‖s signature over this curve
    pub fn signature_size(&self) -> usize {
        2 * self.key_size
    }
}

// GostR3410-2001-CryptoPro-A field constants (XchA uses the same curve)
const CP_A_P: &str = "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFD97";
const CP_A_A: &str = "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFD94";
const CP_A_B: &str = "A6";
const CP_A_Q: &str = "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF6C611070995AD10045841B09B761B893";
const CP_A_X: &str = "1";
const CP_A_Y: &str = "8D91E471E0989CDA27DF505A453F2B7635294F2DDF23E3B122ACC99C9E9F1E14";

// GostR3410-2001-CryptoPro-C field constants (XchB uses the same curve)
const CP_C_P: &str = "9B9F605F5A858107AB1EC85E6B41C8AACF846E86789051D37998F7B9022D759B";
const CP_C_A: &str = "9B9F605F5A858107AB1EC85E6B41C8AACF846E86789051D37998F7B9022D7598";
const CP_C_B: &str = "805A";
const CP_C_Q: &str = "9B9F605F5A858107AB1EC85E6B41C8AA582CA3511EDDFB74F02F3A6598980BB9";
const CP_C_X: &str = "0";
const CP_C_Y: &str = "41ECE55743711A8C3CBF3783CD08C0EE4D4DC440D4641A8F366E550DFDB3BB67";

static CURVES: &[CurveParams] = &[
    CurveParams {
        name: "GostR3410-2001-CryptoPro-A",
        oid: "1.2.643.2.2.35.1",
        p: CP_A_P,
        a: CP_A_A,
        b: CP_A_B,
        q: CP_A_Q,
        cofactor: 1,
        x: CP_A_X,
        y: CP_A_Y,
        key_size: 32,
    },
    CurveParams {
        name: "GostR3410-2001-CryptoPro-B",
        oid: "1.2.643.2.2.35.2",
        p: "8000000000000000000000000000000000000000000000000000000000000C99",
        a: "8000000000000000000000000000000000000000000000000000000000000C96",
        b: "3E1AF419A269A5F866A7D3C25C3DF80AE979259373FF2B182F49D4CE7E1BBC8B",
        q: "800000000000000000000000000000015F700CFFF1A624E5E497161BCC8A198F",
        cofactor: 1,
        x: "1",
        y: "3FA8124359F96680B83D1C3EB2C070E5C545C9858D03ECFB744BF8D717717EFC",
        key_size: 32,
    },
    CurveParams {
        name: "GostR3410-2001-CryptoPro-C",
        oid: "1.2.643.2.2.35.3",
        p: CP_C_P,
        a: CP_C_A,
        b: CP_C_B,
        q: CP_C_Q,
        cofactor: 1,
        x: CP_C_X,
        y: CP_C_Y,
        key_size: 32,
    },
    CurveParams {
        name: "GostR3410-2001-CryptoPro-XchA",
        oid: "1.2.643.2.2.36.0",
        p: CP_A_P,
        a: CP_A_A,
        b: CP_A_B,
        q: CP_A_Q,
        cofactor: 1,
        x: CP_A_X,
        y: CP_A_Y,
        key_size: 32,
    },
    CurveParams {
        name: "GostR3410-2001-CryptoPro-XchB",
        oid: "1.2.643.2.2.36.1",
        p: CP_C_P,
        a: CP_C_A,
        b: CP_C_B,
        q: CP_C_Q,
        cofactor: 1,
        x: CP_C_X,
        y: CP_C_Y,
        key_size: 32,
    },
    CurveParams {
        name: "Tc26-Gost-3410-12-256-paramSetA",
        oid: "1.2.643.7.1.2.1.1.1",
        p: CP_A_P,
        a: "C2173F1513981673AF4892C23035A27CE25E2013BF95AA33B22C656F277E7335",
        b: "295F9BAE7428ED9CCC20E7C359A9D41A22FCCD9108E17BF7BA9337A6F8AE9513",
        q: "400000000000000000000000000000000FD8CDDFC87B6635C115AF556C360C67",
        cofactor: 4,
        x: "91E38443A5E82C0D880923425712B2BB658B9196932E02C78B2582FE742DAA28",
        y: "32879423AB1A0375895786C4BB46E9565FDE0B5344766740AF268ADB32322E5C",
        key_size: 32,
    },
    CurveParams {
        name: "Tc26-Gost-3410-12-512-paramSetA",
        oid: "1.2.643.7.1.2.1.2.1",
        p: "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF\
            FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFDC7",
        a: "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF\
            FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFDC4",
        b: "E8C2505DEDFC86DDC1BD0B2B6667F1DA34B82574761CB0E879BD081CFD0B6265\
            EE3CB090F30D27614CB4574010DA90DD862EF9D4EBEE4761503190785A71C760",
        q: "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF\
            27E69532F48D89116FF22B8D4E0560609B4B38ABFAD2B85DCACDB1411F10B275",
        cofactor: 1,
        x: "3",
        y: "7503CFE87A836AE3A61B8816E25450E6CE5E1C93ACF1ABC1778064FDCBEFA921\
            DF1626BE4FD036E93D75E6A50E3A41E98028FE5FC235F5B889A589CB5215F2A4",
        key_size: 64,
    },
    CurveParams {
        name: "Tc26-Gost-3410-12-512-paramSetB",
        oid: "1.2.643.7.1.2.1.2.2",
        p: "8000000000000000000000000000000000000000000000000000000000000000\
            000000000000000000000000000000000000000000000000000000000000006F",
        a: "8000000000000000000000000000000000000000000000000000000000000000\
            000000000000000000000000000000000000000000000000000000000000006C",
        b: "687D1B459DC841457E3E06CF6F5E2517B97C7D614AF138BCBF85DC806C4B289F\
            3E965D2DB1416D217F8B276FAD1AB69C50F78BEE1FA3106EFB8CCBC7C5140116",
        q: "8000000000000000000000000000000000000000000000000000000000000001\
            49A1EC142565A545ACFDB77BD9D40CFA8B996712101BEA0EC6346C54374F25BD",
        cofactor: 1,
        x: "2",
        y: "1A8F7EDA389B094C2C071E3647A8940F3C123B697578C213BE6DD9E6C8EC7335\
            DCB228FD1EDF4A39152CBCAAF8C0398828041055F94CEEEC7E21340780FE41BD",
        key_size: 64,
    },
    // Defined over the paramSetA field in twisted Edwards form; these are
    // the short Weierstrass equivalents
    CurveParams {
        name: "Tc26-Gost-3410-12-512-paramSetC",
        oid: "1.2.643.7.1.2.1.2.3",
        p: "FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF\
            FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFDC7",
        a: "DC9203E514A721875485A529D2C722FB187BC8980EB866644DE41C68E1430645\
            46E861C0E2C9EDD92ADE71F46FCF50FF2AD97F951FDA9F2A2EB6546F39689BD3",
        b: "B4C4EE28CEBC6C2C8AC12952CF37F16AC7EFB6A9F69F4B57FFDA2E4F0DE5ADE0\
            38CBC2FFF719D2C18DE0284B8BFEF3B52B8CC7A5F5BF0A3C8D2319A5312557E1",
        q: "3FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF\
            C98CDBA46506AB004C33A9FF5147502CC8EDA9E7A769A12694623CEF47F023ED",
        cofactor: 4,
        x: "E2E31EDFC23DE7BDEBE241CE593EF5DE2295B7A9CBAEF021D385F7074CEA043A\
            A27272A7AE602BF2A7B9033DB9ED3610C6FB85487EAE97AAC5BC7928C1950148",
        y: "F5CE40D95B5EB899ABBCCFF5911CB8577939804D6527378B8C108C3D2090FF9B\
            E18E2D33E3021ED2EF32D85822423B6304F726AA854BAE07D0396E9A9ADDC40F",
        key_size: 64,
    },
];

/// All known parameter sets.
pub fn all() -> &'static [CurveParams] {
    CURVES
}

/// Look up a parameter set by name.
pub fn find(name: &str) -> Option<&'static CurveParams> {
    CURVES.iter().find(|c| c.name == name)
}

/// Look up a parameter set by its OID.
pub fn find_by_oid(oid: &str) -> Option<&'static CurveParams> {
    CURVES.iter().find(|c| c.oid == oid)
}
