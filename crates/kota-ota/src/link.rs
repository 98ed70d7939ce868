use url::Url;

/// Turns a Dropbox-style share link (`?dl=0`) into a direct download link (`dl=1`).
/// Links without `dl=0` are returned unchanged.
pub fn direct_download_link(link: &str) -> String {
    let Ok(mut url) = Url::parse(link) else { return link.replace("?dl=0", "?dl=1") };
    if !url.query_pairs().any(|(k, v)| k == "dl" && v == "0") { return link.to_string(); }
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "dl" && v == "0" { "1".to_string() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();
    url.query_pairs_mut().clear().extend_pairs(pairs);
    url.to_string()
}
