//! Ticker aliases for sources that do not key on the plain ticker.

use coinwatch_core::Symbol;

/// CoinMarketCap ticker for a symbol.
///
/// A few projects were renamed; CoinMarketCap still lists them under the
/// old ticker. Everything else maps to itself.
pub fn coinmarketcap_symbol(symbol: &Symbol) -> &str {
    match symbol.as_str() {
        "POLY" => "MATIC",
        "RENDER" => "RNDR",
        other => other,
    }
}

/// CoinGecko coin id for a symbol; unknown tickers fall back to lowercase.
pub fn coingecko_id(symbol: &Symbol) -> String {
    let id = match symbol.as_str() {
        "BTC" => "bitcoin",
        "ETH" => "ethereum",
        "BNB" => "binancecoin",
        "SOL" => "solana",
        "XRP" => "ripple",
        "ADA" => "cardano",
        "DOGE" => "dogecoin",
        "DOT" => "polkadot",
        "MATIC" | "POLY" => "matic-network",
        "TRX" => "tron",
        "TON" => "the-open-network",
        "NOT" => "notcoin",
        "USDT" => "tether",
        "USDC" => "usd-coin",
        "SHIB" => "shiba-inu",
        "AVAX" => "avalanche-2",
        "LINK" => "chainlink",
        "UNI" => "uniswap",
        "LTC" => "litecoin",
        "BCH" => "bitcoin-cash",
        "PEPE" => "pepe",
        "ARB" => "arbitrum",
        "OP" => "optimism",
        "NEAR" => "near",
        "APT" => "aptos",
        "SUI" => "sui",
        "STX" => "blockstack",
        "INJ" => "injective-protocol",
        "TIA" => "celestia",
        "SEI" => "sei-network",
        "FET" => "fetch-ai",
        "RENDER" | "RNDR" => "render-token",
        "GRT" => "the-graph",
        "IMX" => "immutable-x",
        "RUNE" => "thorchain",
        "ATOM" => "cosmos",
        "FIL" => "filecoin",
        "HBAR" => "hedera-hashgraph",
        "VET" => "vechain",
        "ALGO" => "algorand",
        "ICP" => "internet-computer",
        "SAND" => "the-sandbox",
        "MANA" => "decentraland",
        "AXS" => "axie-infinity",
        "XLM" => "stellar",
        "XMR" => "monero",
        "ETC" => "ethereum-classic",
        "WLD" => "worldcoin-wld",
        "JUP" => "jupiter-exchange-solana",
        "BONK" => "bonk",
        "WIF" => "dogwifcoin",
        "PYTH" => "pyth-network",
        "FLOKI" => "floki",
        other => return other.to_lowercase(),
    };
    id.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coinmarketcap_aliases() {
        assert_eq!(coinmarketcap_symbol(&Symbol::new("POLY")), "MATIC");
        assert_eq!(coinmarketcap_symbol(&Symbol::new("RENDER")), "RNDR");
        assert_eq!(coinmarketcap_symbol(&Symbol::new("BTC")), "BTC");
    }

    #[test]
    fn test_coingecko_ids() {
        assert_eq!(coingecko_id(&Symbol::new("BTC")), "bitcoin");
        assert_eq!(coingecko_id(&Symbol::new("POLY")), "matic-network");
        assert_eq!(coingecko_id(&Symbol::new("NEWCOIN")), "newcoin");
    }
}
