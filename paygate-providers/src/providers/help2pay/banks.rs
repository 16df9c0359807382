//! Deposit banks by currency

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// A bank the deposit page can route to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bank {
    pub code: &'static str,
    pub name: &'static str,
}

const fn bank(code: &'static str, name: &'static str) -> Bank {
    Bank { code, name }
}

const MYR_BANKS: &[Bank] = &[
    bank("AFF", "Affin Bank"),
    bank("ALB", "Alliance Bank Malaysia Berhad"),
    bank("AMB", "AmBank Group"),
    bank("BIMB", "Bank Islam Malaysia Berhad"),
    bank("BSN", "Bank Simpanan Nasional"),
    bank("CIMB", "CIMB Bank Berhad"),
    bank("HLB", "Hong Leong Bank Berhad"),
    bank("HSBC", "HSBC Bank (Malaysia) Berhad"),
    bank("MBB", "Maybank Berhad"),
    bank("OCBC", "OCBC Bank (Malaysia) Berhad"),
    bank("PBB", "Public Bank Berhad"),
    bank("RHB", "RHB Banking Group"),
    bank("UOB", "United Overseas Bank (Malaysia) Bhd"),
    bank("DUITNOW", "Duitnow"),
    bank("TNGODUITNOW", "Touch N Go"),
    bank("GRABDUITNOW", "GrabPay"),
    bank("MAEDUITNOW", "MAE"),
    bank("BOOSTDUITNOW", "BOOST"),
];

const THB_BANKS: &[Bank] = &[
    bank("BBL", "Bangkok Bank"),
    bank("BOA", "Bank of Ayudhya (Krungsri)"),
    bank("KKR", "Karsikorn Bank (K-Bank)"),
    bank("KNK", "Kiatnakin Bank"),
    bank("KTB", "Krung Thai Bank"),
    bank("SCB", "Siam Commercial Bank"),
    bank("TMB", "TMBThanachart Bank(TTB)"),
    bank("PPTP", "Promptpay"),
    bank("TSTB", "Thai Semi Transfer Bank"),
    bank("BBLLBT", "BBL Local Bank Transfer"),
    bank("BOALBT", "BOA Local Bank Transfer"),
    bank("KKRLBT", "KKR Local Bank Transfer"),
    bank("SCBLBT", "SCB Local Bank Transfer"),
    bank("TMBLBT", "TMB Local Bank Transfer"),
];

const VND_BANKS: &[Bank] = &[
    bank("ACB", "Asia Commercial Bank"),
    bank("AGB", "Agribank"),
    bank("BIDV", "Bank for Investment and Development of Vietnam"),
    bank("DAB", "DongA Bank"),
    bank("EXIM", "Eximbank Vietnam"),
    bank("HDB", "HDB Bank"),
    bank("MB", "Military Commercial Joint Stock Bank"),
    bank("MTMB", "Maritime Bank"),
    bank("OCB", "Orient Commercial Joint Stock Bank"),
    bank("SACOM", "Sacombank"),
    bank("TCB", "Techcombank"),
    bank("TPB", "Tien Phong Bank"),
    bank("VCB", "Vietcombank"),
    bank("VIB", "Vietnam International Bank"),
    bank("VPB", "VP Bank"),
    bank("VTB", "Vietinbank"),
    bank("VIETQR", "VietQRpay"),
    bank("VIETQRMOMO", "VietQR MOMO"),
    bank("VIETQRZALO", "VietQR Zalo Pay"),
    bank("VIETQRVIETTEL", "VietQR Viettel Pay"),
    bank("VSTB", "VND Semi Transfer Bank"),
    bank("VCBLBT", "Vietcom Bank Local Bank Transfer"),
    bank("DABLBT", "Donga Bank Local Bank Transfer"),
];

const PHP_BANKS: &[Bank] = &[
    bank("BDO", "Banco de Oro"),
    bank("BPI", "Bank of the Philippine Islands"),
    bank("LBP", "Land Bank of the Philippines"),
    bank("RCBC", "Rizal Commercial Banking Corporation"),
    bank("SBC", "Security Bank Corporation"),
    bank("QRPH", "QRPH"),
    bank("BPIQRPH", "Bank of the Philippine Islands QRPH"),
    bank("EWBQRPH", "Eastwest bank QRPH"),
    bank("RCBCQRPH", "Rizal Commercial Banking Corporation QRPH"),
    bank("UBPQRPH", "Union Bank of the Philippines QRPH"),
    bank("MTBQRPH", "Metropolitan Bank & Trust Company QRPH"),
    bank("GCASHQRPH", "GCASH QRPH"),
    bank("PSTB", "PHP Semi Transfer Bank"),
    bank("BPILBT", "Bank of the Philippine Islands LBT"),
];

const INR_BANKS: &[Bank] = &[
    bank("AXIS", "AXIS Bank"),
    bank("HDFC", "HDFC Bank"),
    bank("IDFC", "IDFC Bank"),
    bank("INDUSIND", "INDUSIND Bank"),
    bank("KOTAK", "KOTAK Mahindra Bank"),
    bank("YES", "YES Bank"),
    bank("CIUB", "CITY UNION"),
    bank("FEDERAL", "Federal Bank"),
    bank("IDIB", "INDIAN BANK"),
    bank("ICICI", "ICICI Bank Limited"),
    bank("UPI", "Unified Payments Interface"),
    bank("HDFCUPI", "HDFC Bank UPI"),
];

const IDR_BANKS: &[Bank] = &[
    bank("BCA", "Bank Central Asia"),
    bank("BNI", "Bank Negara Indonesia"),
    bank("BRI", "Bank Rakyat Indonesia"),
    bank("CIMBN", "CIMB Niaga"),
    bank("MDR", "Mandiri Bank"),
    bank("PMTB", "Permata Bank"),
    bank("PANIN", "Panin Bank"),
    bank("QRIS", "QRIS"),
    bank("DANAQRIS", "DANA QRIS"),
    bank("GOPAYQRIS", "GO PAY QRIS"),
    bank("LINKAJAQRIS", "LINK AJA QRIS"),
    bank("OVOQRIS", "OVO QRIS"),
    bank("SHOPEEQRIS", "Shopee Pay QRIS"),
    bank("ISTB", "IDR Virtual Account"),
    bank("BCAVA", "BCA Virtual Account"),
    bank("BNIVA", "BNI Virtual Account"),
    bank("BRIVA", "BRI Virtual Account"),
    bank("CIMBNVA", "CIMBN Virtual Account"),
    bank("MBBIVA", "MBBI Virtual Account"),
    bank("MDRVA", "MDR Virtual Account"),
    bank("PMTBVA", "PMTB Virtual Account"),
    bank("PANINVA", "PANIN Virtual Account"),
    bank("IMTB", "IDR Manual Transfer Bank"),
    bank("BCALBT", "BCA Bank Local Bank Transfer"),
    bank("PMTBLBT", "Bank Permata Local Bank Transfer"),
];

static DEPOSIT_BANKS: Lazy<HashMap<&'static str, &'static [Bank]>> = Lazy::new(|| {
    HashMap::from([
        ("MYR", MYR_BANKS),
        ("THB", THB_BANKS),
        ("VND", VND_BANKS),
        ("PHP", PHP_BANKS),
        ("INR", INR_BANKS),
        ("IDR", IDR_BANKS),
    ])
});

/// Banks accepted for deposits in `currency`
pub fn banks_for(currency: &str) -> &'static [Bank] {
    DEPOSIT_BANKS.get(currency).copied().unwrap_or_default()
}

/// Look a bank up by code in any currency
pub fn find_bank(code: &str) -> Option<&'static Bank> {
    DEPOSIT_BANKS
        .values()
        .flat_map(|banks| banks.iter())
        .find(|bank| bank.code == code)
}

pub fn is_supported_currency(currency: &str) -> bool {
    DEPOSIT_BANKS.contains_key(currency)
}

pub fn is_currency_bank(currency: &str, code: &str) -> bool {
    banks_for(currency).iter().any(|bank| bank.code == code)
}
