/// Display version information
pub fn execute() {
    println!("collectivex {}", env!("CARGO_PKG_VERSION"));
    println!("Operator CLI for collectivex threshold multisig accounts");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_execute() {
        // Version command should not panic
        execute();
    }
}
