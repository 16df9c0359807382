//! Integration tests for paygate-signing

use paygate_signing::*;

#[test]
fn test_secret_suffix_sha512_form_escaped() {
    let scheme = SigningScheme::new(
        SortedPolicy::new()
            .escape(UrlEscape::QueryPlus)
            .suffix(SecretSuffix::Bare)
            .reserved("sign"),
        DigestAlgorithm::Sha512,
        DigestEncoding::LowerHex,
        KeyMaterial::shared("s3cret"),
    )
    .unwrap();

    let fields = FieldSet::new()
        .with("merchant_reference", "ORD-1")
        .with("currency", "MYR")
        .with("amount", "10.00")
        .with("customer_first_name", "Ann Lee")
        .with("customer_email", "ann+1@example.com");

    assert_eq!(
        scheme.canonical(&fields).unwrap(),
        "amount=10.00&currency=MYR&customer_email=ann%2B1%40example.com\
         &customer_first_name=Ann+Lee&merchant_reference=ORD-1s3cret"
    );
    assert_eq!(
        scheme.sign(&fields).unwrap(),
        "31e80e2c53e92647f9afd1b023281da28f6cf7ac106ddc157867f19619128ca0\
         7234ea3f75f4e0b408bbd8c7729d5716bae7586e3e2a70cd4d3c5918b8796b45"
    );
}

#[test]
fn test_template_md5_upper_hex() {
    let scheme = SigningScheme::new(
        Template::parse(
            "{Merchant}{Reference}{Customer}{Amount}{Currency}{Datetime}{SecurityCode}{ClientIP}",
        )
        .unwrap()
        .with_secret("SecurityCode"),
        DigestAlgorithm::Md5,
        DigestEncoding::UpperHex,
        KeyMaterial::shared("SEC"),
    )
    .unwrap();

    let fields = FieldSet::new()
        .with("Merchant", "M001")
        .with("Reference", "R1")
        .with("Customer", "C9")
        .with("Amount", "100.00")
        .with("Currency", "MYR")
        .with("Datetime", "20240102150405")
        .with("ClientIP", "1.2.3.4");

    assert_eq!(
        scheme.sign(&fields).unwrap(),
        "D970E9A9B97C55CCC6C66BEBDFD819B3"
    );
}

#[test]
fn test_hmac_known_vector_and_sensitivity() {
    let template = || Template::parse("{msg}").unwrap();
    let scheme = SigningScheme::new(
        template(),
        DigestAlgorithm::HmacSha256,
        DigestEncoding::LowerHex,
        KeyMaterial::shared("key"),
    )
    .unwrap();

    let fields = FieldSet::new().with("msg", "The quick brown fox jumps over the lazy dog");
    let first = scheme.sign(&fields).unwrap();
    assert_eq!(
        first,
        "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
    );
    assert_eq!(scheme.sign(&fields).unwrap(), first);

    let changed = FieldSet::new().with("msg", "The quick brown fox jumps over the lazy doh");
    assert_eq!(
        scheme.sign(&changed).unwrap(),
        "b406df04bcb111567de87e123063ae89a3fe41879f1f3ce67d5a9b2d0ba9115a"
    );

    let other_key = SigningScheme::new(
        template(),
        DigestAlgorithm::HmacSha256,
        DigestEncoding::LowerHex,
        KeyMaterial::shared("kez"),
    )
    .unwrap();
    assert_ne!(other_key.sign(&fields).unwrap(), first);
}

#[test]
fn test_peska_style_hmac_template() {
    let scheme = SigningScheme::new(
        Template::parse(
            "{ts}{method}{path}order_no={order_no}merchant_email={merchant_email}\
             transfer_currency={transfer_currency}api_key={api_key}",
        )
        .unwrap(),
        DigestAlgorithm::HmacSha256,
        DigestEncoding::LowerHex,
        KeyMaterial::shared("topsecret"),
    )
    .unwrap();

    let fields = FieldSet::new()
        .with("ts", "1700000000")
        .with("method", "POST")
        .with("path", "/v1/merchant/transfer")
        .with("order_no", "O1")
        .with("merchant_email", "m@x.com")
        .with("transfer_currency", "USD")
        .with("api_key", "AK");

    assert_eq!(
        scheme.sign(&fields).unwrap(),
        "8a3e6357f2d0de415cc82e9d2d35f5d99ae2dc365639c103b4e0d6ef0cc34006"
    );
}

#[test]
fn test_double_hash_reference_vector() {
    let scheme = SigningScheme::new(
        Template::parse(
            "{OrderNumber}{OrderAmount}{OrderCurrency}{OrderDescription}{MerchantPassword}",
        )
        .unwrap()
        .with_secret("MerchantPassword")
        .uppercase(),
        DigestAlgorithm::Md5ThenSha1,
        DigestEncoding::LowerHex,
        KeyMaterial::shared("secret"),
    )
    .unwrap();

    let fields = FieldSet::new()
        .with("OrderNumber", "X1")
        .with("OrderAmount", "1.00")
        .with("OrderCurrency", "USD")
        .with("OrderDescription", "T");

    assert_eq!(scheme.canonical(&fields).unwrap(), "X11.00USDTSECRET");
    let signature = scheme.sign(&fields).unwrap();
    assert_eq!(signature, "9439a3630011cf89409fcb86a88faf6ece0464b9");
    assert!(scheme.verify(&fields, &signature.to_uppercase()).is_ok());
}

#[test]
fn test_double_hash_upper_cases_input() {
    let out = DigestAlgorithm::Md5ThenSha1
        .compute("x11.00usdtsecret", &KeyMaterial::shared(""))
        .unwrap();
    assert_eq!(
        DigestEncoding::LowerHex.encode(&out),
        "9439a3630011cf89409fcb86a88faf6ece0464b9"
    );
}

#[test]
fn test_verifier_case_policy() {
    let verifier = SignatureVerifier::case_insensitive();
    assert!(verifier.verify("AB12", "ab12").is_ok());
    assert!(matches!(
        verifier.verify("AB12", "ab13"),
        Err(SigningError::SignatureMismatch { .. })
    ));
}

#[test]
fn test_xpay_full_byte_range() {
    let bytes: Vec<u8> = (0..=255u8).collect();
    let encoded = xpay::encode(&bytes);
    assert!(encoded.bytes().all(|c| c.is_ascii_hexdigit() || xpay::is_delimiter(c)));
    assert_eq!(xpay::decode(&encoded).unwrap(), bytes);
}

#[test]
fn test_xpay_malformed_inputs() {
    assert!(matches!(
        xpay::decode("41gh"),
        Err(SigningError::MalformedEncoding { .. })
    ));
    assert!(matches!(
        xpay::decode("41g42"),
        Err(SigningError::MalformedEncoding { .. })
    ));
}
