//! Test helpers for the WAPI client

#[cfg(test)]
#[allow(dead_code)]
pub fn create_test_client(url: &str) -> super::Client {
    super::Client::new(super::ClientConfig::new(url, "admin", "infoblox")).unwrap()
}
