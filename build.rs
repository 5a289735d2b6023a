use proc_macro2::TokenStream;
use quote::quote;
use std::env;
use std::fs;
use std::path::Path;

// Note: These types are only used in build.rs for parsing the TOML file
// The actual types used in the crate are generated from this data

#[derive(Debug, serde::Deserialize)]
struct FrequencyConfig {
    frequency: Vec<FrequencyDef>,
}

#[derive(Debug, serde::Deserialize)]
struct FrequencyDef {
    enum_name: String,
    milliseconds: u64,
    interval: String,
    display_name: String,
}

fn main() {
    println!("cargo:rerun-if-changed=config/frequencies.toml");

    // 讀取 frequencies.toml
    let toml_content = fs::read_to_string("config/frequencies.toml")
        .expect("Failed to read config/frequencies.toml");

    let config: FrequencyConfig =
        toml::from_str(&toml_content).expect("Failed to parse config/frequencies.toml");

    // K 線週期必須是毫秒的正整數
    for freq in &config.frequency {
        assert!(
            freq.milliseconds > 0,
            "frequency {} must have a positive duration",
            freq.enum_name
        );
    }

    // 生成頻率宏定義
    let frequencies_macro = generate_frequencies_macro(&config.frequency);

    // 寫入到輸出目錄
    let out_dir = env::var_os("OUT_DIR").expect("OUT_DIR is not set");
    let dest_path = Path::new(&out_dir).join("frequencies_generated.rs");

    fs::write(&dest_path, frequencies_macro.to_string())
        .expect("Failed to write generated frequency code");
}

fn generate_frequencies_macro(frequencies: &[FrequencyDef]) -> TokenStream {
    // 為每個頻率生成 token
    let frequency_entries: Vec<TokenStream> = frequencies
        .iter()
        .map(|freq| {
            let enum_name = syn::Ident::new(&freq.enum_name, proc_macro2::Span::call_site());
            let milliseconds = freq.milliseconds;
            let interval = &freq.interval;
            let display_name = &freq.display_name;

            quote! {
                (#enum_name, #interval, #milliseconds, #display_name)
            }
        })
        .collect();

    // 生成完整的宏定義
    quote! {
        /// 主頻率定義宏 - 包含所有 K 線週期的元數據
        /// 這是所有其他宏的數據源
        macro_rules! frequencies {
            ($call:ident) => {
                $call! {
                    #(#frequency_entries),*
                }
            };
        }
    }
}
