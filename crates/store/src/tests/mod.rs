mod helpers;
mod index_tests;
mod settings_tests;
mod store_tests;
