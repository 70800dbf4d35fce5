use serde::{Deserialize, Serialize};

macro_rules! elements {
    ($($symbol:ident = $number:literal),* $(,)?) => {
        /// Chemical element, represented by its atomic number.
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[repr(u8)]
        pub enum ElementType {
            $($symbol = $number),*
        }

        impl ElementType {
            const ALL: &'static [ElementType] = &[$(ElementType::$symbol),*];

            pub fn symbol(self) -> &'static str {
                match self {
                    $(ElementType::$symbol => stringify!($symbol)),*
                }
            }
        }
    };
}

elements! {
    H = 1, He = 2,
    Li = 3, Be = 4, B = 5, C = 6, N = 7, O = 8, F = 9, Ne = 10,
    Na = 11, Mg = 12, Al = 13, Si = 14, P = 15, S = 16, Cl = 17, Ar = 18,
    K = 19, Ca = 20, Sc = 21, Ti = 22, V = 23, Cr = 24, Mn = 25, Fe = 26, Co = 27,
    Ni = 28, Cu = 29, Zn = 30, Ga = 31, Ge = 32, As = 33, Se = 34, Br = 35, Kr = 36,
    I = 53,
}

impl ElementType {
    /// Look up an element by its symbol, ignoring case.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let symbol = symbol.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|element| element.symbol().eq_ignore_ascii_case(symbol))
    }

    pub fn atomic_number(self) -> u8 {
        self as u8
    }

    pub fn is_hydrogen(self) -> bool {
        self == ElementType::H
    }
}
