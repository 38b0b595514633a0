pub mod runtime;

mod test_echo;
mod test_startup;
mod test_tls;
