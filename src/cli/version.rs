/// Version banner.
pub fn banner() -> String {
    format!(
        "certgov {}\nOperator CLI for credential governance (governor, timelock, token, credential)",
        env!("CARGO_PKG_VERSION")
    )
}

pub fn execute() {
    println!("{}", banner());
}
