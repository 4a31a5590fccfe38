//! ImageNet class index to wildlife species name mapping.
//!
//! Covers the subset of the 1000 ImageNet classes that correspond to wild
//! animal species. The table is sorted by class index so lookups can binary
//! search. Display names may be shared by more than one class index; callers
//! must aggregate duplicates rather than assume uniqueness.

/// ImageNet classes with a wildlife species name, sorted by class index.
pub const WILDLIFE_CLASSES: &[(usize, &str)] = &[
    // Galliformes and songbirds
    (7, "Cock (Rooster)"),
    (8, "Hen"),
    (9, "Ostrich"),
    (10, "Brambling"),
    (11, "Goldfinch"),
    (12, "House Finch"),
    (13, "Junco"),
    (14, "Indigo Bunting"),
    (15, "Robin"),
    (16, "Bulbul"),
    (17, "Jay"),
    (18, "Magpie"),
    (19, "Chickadee"),
    (20, "Water Ouzel"),
    (21, "Kite"),
    (22, "Bald Eagle"),
    (23, "Vulture"),
    (24, "Great Grey Owl"),
    // Amphibians and reptiles
    (31, "Tree Frog"),
    (32, "Tailed Frog"),
    (33, "Loggerhead Turtle"),
    (34, "Leatherback Turtle"),
    (35, "Mud Turtle"),
    (36, "Terrapin"),
    (37, "Box Turtle"),
    (38, "Banded Gecko"),
    (39, "Common Iguana"),
    (40, "American Chameleon"),
    (41, "Whiptail Lizard"),
    (42, "Agama"),
    (43, "Frilled Lizard"),
    (44, "Alligator Lizard"),
    (45, "Gila Monster"),
    (46, "Green Lizard"),
    (47, "African Chameleon"),
    (48, "Komodo Dragon"),
    (49, "African Crocodile"),
    (50, "American Alligator"),
    (51, "Triceratops"),
    // Game birds and parrots
    (80, "Black Grouse"),
    (81, "Ptarmigan"),
    (82, "Ruffed Grouse"),
    (83, "Prairie Chicken"),
    (84, "Peacock"),
    (85, "Quail"),
    (86, "Partridge"),
    (87, "African Grey Parrot"),
    (88, "Macaw"),
    (89, "Sulphur-Crested Cockatoo"),
    (90, "Lorikeet"),
    // Wading and water birds
    (127, "White Stork"),
    (128, "Black Stork"),
    (129, "Spoonbill"),
    (130, "Flamingo"),
    (131, "Little Blue Heron"),
    (132, "American Egret"),
    (133, "Bittern"),
    (134, "Crane"),
    (135, "Limpkin"),
    (136, "European Gallinule"),
    (137, "American Coot"),
    (138, "Bustard"),
    (139, "Ruddy Turnstone"),
    (140, "Red-Backed Sandpiper"),
    (141, "Redshank"),
    (142, "Dowitcher"),
    (143, "Oystercatcher"),
    (144, "Pelican"),
    (145, "King Penguin"),
    (146, "Albatross"),
    // Marine mammals
    (147, "Sea Lion"),
    (148, "Seal"),
    // Wild canines
    (273, "Dingo"),
    (274, "Wild Dog"),
    (275, "African Hunting Dog"),
    // Cats
    (281, "Tabby Cat"),
    (282, "Tiger Cat"),
    (283, "Persian Cat"),
    // Big cats
    (288, "Leopard"),
    (289, "Snow Leopard"),
    (290, "Jaguar"),
    (291, "Lion"),
    (292, "Tiger"),
    (293, "Cheetah"),
    // Bears
    (294, "Brown Bear"),
    (295, "American Black Bear"),
    (296, "Ice Bear (Polar Bear)"),
    (297, "Sloth Bear"),
    // Ungulates
    (340, "Zebra"),
    (341, "Pig"),
    (342, "Wild Boar"),
    (343, "Warthog"),
    (344, "Hippopotamus"),
    (345, "Ox"),
    (346, "Water Buffalo"),
    (347, "Bison"),
    (349, "Gazelle"),
    (350, "Antelope"),
    (351, "Impala"),
    (352, "Bighorn Sheep"),
    (353, "Ibex"),
    (354, "Giraffe"),
    (356, "Rhinoceros"),
    // Rodents and other small mammals
    (357, "Hamster"),
    (358, "Porcupine"),
    (359, "Fox Squirrel"),
    (360, "Marmot"),
    (361, "Beaver"),
    (362, "Guinea Pig"),
    (363, "Hog"),
    (364, "Sorrel (Horse)"),
    // Primates
    (365, "Gorilla"),
    (366, "Chimpanzee"),
    (367, "Orangutan"),
    (368, "Gibbon"),
    (369, "Baboon"),
    (370, "Macaque"),
    (371, "Langur"),
    (372, "Colobus Monkey"),
    (373, "Proboscis Monkey"),
    (374, "Marmoset"),
    (375, "Capuchin"),
    (376, "Spider Monkey"),
    // Elephants
    (385, "Indian Elephant"),
    (386, "African Elephant"),
];

/// Look up the species name for an ImageNet class index.
pub fn species_for(class_idx: usize) -> Option<&'static str> {
    WILDLIFE_CLASSES
        .binary_search_by_key(&class_idx, |&(idx, _)| idx)
        .ok()
        .map(|pos| WILDLIFE_CLASSES[pos].1)
}
